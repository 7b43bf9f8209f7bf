//! Ordered delivery of [`RunEvent`]s from one producer to one consumer.
//!
//! Backed by an unbounded `tokio::sync::mpsc` channel: a run never blocks
//! on a slow consumer and nothing accepted is dropped. The stream finishes
//! once a terminal event has been handed out, even if the producer is still
//! alive, and also when the producer goes away.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use tokio::sync::mpsc;

use crate::event::RunEvent;

/// The consumer is gone or a terminal event was already sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("event stream is closed")]
pub struct StreamClosed;

/// Create a connected sender/stream pair for one run.
pub fn channel() -> (EventSender, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventSender {
            tx,
            finished: AtomicBool::new(false),
        },
        EventStream { rx, done: false },
    )
}

// ---------------------------------------------------------------------------
// Producer side
// ---------------------------------------------------------------------------

/// Producer half. Not `Clone`: a run has exactly one producer.
#[derive(Debug)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<RunEvent>,
    finished: AtomicBool,
}

impl EventSender {
    /// Queue an event for the consumer.
    ///
    /// Fails once the consumer has dropped its end or after a terminal event
    /// was accepted; the event is then discarded.
    pub fn emit(&self, event: RunEvent) -> Result<(), StreamClosed> {
        if self.finished.load(Ordering::Acquire) {
            return Err(StreamClosed);
        }
        let terminal = event.is_terminal();
        self.tx.send(event).map_err(|_| StreamClosed)?;
        if terminal {
            self.finished.store(true, Ordering::Release);
        }
        Ok(())
    }

    /// Whether a terminal event has been accepted.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Whether the consumer has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

// ---------------------------------------------------------------------------
// Consumer side
// ---------------------------------------------------------------------------

/// Consumer half, also usable as a [`futures::Stream`].
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<RunEvent>,
    done: bool,
}

impl EventStream {
    /// Next event in emission order, or `None` once the run has ended.
    pub async fn recv(&mut self) -> Option<RunEvent> {
        std::future::poll_fn(|cx| self.poll_event(cx)).await
    }

    /// Drain every remaining event.
    pub async fn collect_all(mut self) -> Vec<RunEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.recv().await {
            events.push(event);
        }
        events
    }

    fn poll_event(&mut self, cx: &mut Context<'_>) -> Poll<Option<RunEvent>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.done = true;
                    self.rx.close();
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl futures::Stream for EventStream {
    type Item = RunEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_event(cx)
    }
}
