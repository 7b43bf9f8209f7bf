//! Progress events of an audit run and the channel that carries them.
//!
//! - [`event`] -- the [`RunEvent`] variant type and its text payload.
//! - [`wire`] -- marker tokens consumers key off.
//! - [`stream`] -- ordered single-producer/single-consumer delivery.

pub mod event;
pub mod stream;
pub mod wire;

pub use event::RunEvent;
pub use stream::{channel, EventSender, EventStream, StreamClosed};
