//! Shared subprocess supervision.
//!
//! [`spawn`] starts a fully configured [`Command`] with stdout and stderr
//! both attached to the write end of one pipe, so the lines arrive in the
//! order the process wrote them. A reader thread splits the pipe into lines
//! and the returned [`RunningScript`] hands them out while enforcing the
//! optional timeout and honouring cancellation. Each platform launcher
//! builds the command for its interpreter and delegates here.

use std::io::{self, BufRead, BufReader, PipeReader, Read};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::executor::{LaunchOptions, ScriptError, ScriptProcess};

/// Longest line handed out in one piece (64 KiB). Longer output without a
/// newline is split so a runaway script cannot exhaust memory.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Lines buffered between the reader thread and the consumer.
const LINE_BUFFER: usize = 256;

/// Spawn `cmd` with stdout and stderr merged into one pipe and stdin closed.
///
/// The caller sets program and arguments. `kill_on_drop(true)` guarantees
/// the child is killed if the [`RunningScript`] is dropped early.
pub fn spawn(mut cmd: Command, options: LaunchOptions) -> Result<RunningScript, ScriptError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    let launch_error = |source: io::Error| ScriptError::Launch {
        program: program.clone(),
        source,
    };

    let (reader, writer) = io::pipe().map_err(launch_error)?;
    let stderr_writer = writer.try_clone().map_err(launch_error)?;

    cmd.stdin(Stdio::null())
        .stdout(writer)
        .stderr(stderr_writer)
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(launch_error)?;
    // The command still owns the parent's copies of the write end; the
    // reader only sees EOF once they are closed.
    drop(cmd);

    let lines = spawn_line_reader(reader, &program).map_err(launch_error)?;

    let started = Instant::now();
    Ok(RunningScript {
        child,
        lines,
        started,
        deadline: options.timeout.map(|timeout| started + timeout),
        cancel: options.cancel,
    })
}

/// Read the merged pipe on a dedicated thread. Blocking reads never touch
/// the runtime, and the thread exits at EOF or once the receiver is gone.
fn spawn_line_reader(
    reader: PipeReader,
    program: &str,
) -> io::Result<mpsc::Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::Builder::new()
        .name(format!("script-output:{program}"))
        .spawn(move || {
            let mut splitter = LineSplitter::new(reader);
            loop {
                let item = match splitter.next_line() {
                    Ok(Some(line)) => Ok(line),
                    Ok(None) => break,
                    Err(e) => Err(e),
                };
                let failed = item.is_err();
                if tx.blocking_send(item).is_err() || failed {
                    break;
                }
            }
        })?;
    Ok(rx)
}

/// A spawned script whose output is consumed line by line.
#[derive(Debug)]
pub struct RunningScript {
    child: Child,
    lines: mpsc::Receiver<io::Result<String>>,
    started: Instant,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

enum Step<T> {
    Ready(T),
    Cancelled,
    TimedOut,
}

impl RunningScript {
    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "Script process already gone");
        }
    }

    fn timeout_error(&self) -> ScriptError {
        ScriptError::Timeout {
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }

    /// Kill the child and turn an interruption into the matching error.
    async fn interrupt(&mut self, cancelled: bool) -> ScriptError {
        self.kill().await;
        if cancelled {
            tracing::info!("Script cancelled");
            ScriptError::Cancelled
        } else {
            let err = self.timeout_error();
            tracing::warn!(error = %err, "Script killed after timeout");
            err
        }
    }
}

impl ScriptProcess for RunningScript {
    async fn next_line(&mut self) -> Result<Option<String>, ScriptError> {
        let deadline = self.deadline;
        let step = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Step::Cancelled,
            () = sleep_until(deadline) => Step::TimedOut,
            line = self.lines.recv() => Step::Ready(line),
        };

        match step {
            Step::Ready(Some(Ok(line))) => Ok(Some(line)),
            Step::Ready(None) => Ok(None),
            Step::Ready(Some(Err(e))) => {
                self.kill().await;
                Err(ScriptError::IoError(e))
            }
            Step::Cancelled => Err(self.interrupt(true).await),
            Step::TimedOut => Err(self.interrupt(false).await),
        }
    }

    async fn wait(mut self) -> Result<i32, ScriptError> {
        let deadline = self.deadline;
        let step = tokio::select! {
            biased;
            () = self.cancel.cancelled() => Step::Cancelled,
            () = sleep_until(deadline) => Step::TimedOut,
            status = self.child.wait() => Step::Ready(status),
        };

        match step {
            Step::Ready(status) => Ok(status?.code().unwrap_or(-1)),
            Step::Cancelled => Err(self.interrupt(true).await),
            Step::TimedOut => Err(self.interrupt(false).await),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Line splitter over the merged output pipe.
#[derive(Debug)]
struct LineSplitter<R> {
    reader: Option<BufReader<R>>,
    pending: Vec<u8>,
}

impl<R: Read> LineSplitter<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: Some(BufReader::new(inner)),
            pending: Vec::new(),
        }
    }

    /// Next complete line, or `None` once the pipe is closed and drained.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        loop {
            let available = reader.fill_buf()?;
            if available.is_empty() {
                self.reader = None;
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(decode_line(std::mem::take(&mut self.pending))));
            }

            if let Some(pos) = available.iter().position(|&b| b == b'\n') {
                self.pending.extend_from_slice(&available[..=pos]);
                reader.consume(pos + 1);
                return Ok(Some(decode_line(std::mem::take(&mut self.pending))));
            }

            let room = MAX_LINE_BYTES.saturating_sub(self.pending.len());
            let take = available.len().min(room);
            self.pending.extend_from_slice(&available[..take]);
            reader.consume(take);
            if self.pending.len() >= MAX_LINE_BYTES {
                let cut = char_boundary(&self.pending);
                let rest = self.pending.split_off(cut);
                return Ok(Some(decode_line(std::mem::replace(&mut self.pending, rest))));
            }
        }
    }
}

/// Length of the longest prefix of `bytes` that does not end inside a
/// multi-byte UTF-8 sequence. Invalid bytes count as complete.
fn char_boundary(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let tail_start = len.saturating_sub(3);
    // Find where the last (possibly incomplete) character starts.
    let Some(lead) = (tail_start..len).rev().find(|&i| bytes[i] & 0xC0 != 0x80) else {
        return len;
    };
    match std::str::from_utf8(&bytes[lead..]) {
        Err(e) if e.error_len().is_none() && lead > 0 => lead,
        _ => len,
    }
}

/// Strip the line terminator and decode, replacing invalid UTF-8.
fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
