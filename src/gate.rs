//! Boot gate and send queue.
//!
//! The peripheral resets every time its serial port is opened and cannot
//! receive anything until its bootloader hands over. The [`BootGate`] owns the
//! transport write half and holds outbound commands back during that window:
//!
//! ```text
//!            on_reconnect()                 deadline expires
//! ┌────────┐ ───────────────► ┌────────┐ ──────────────────► ┌──────┐
//! │ (any)  │                  │ CLOSED │   on_gate_open()     │ OPEN │
//! └────────┘                  └────────┘                      └──────┘
//!                              submit: queue                  submit: write
//! ```
//!
//! - Reconnecting discards the queue. The peer has forgotten the old session,
//!   so replaying its commands would be wrong.
//! - Opening drains the queue in submission order, each entry written once.
//! - Nothing is written directly while CLOSED, so a direct write can never
//!   overtake a queued one.
//!
//! The gate does not run its own timer. It exposes the [`deadline`] and the
//! owner (the link session loop) calls [`on_gate_open`] when it passes.
//!
//! [`deadline`]: BootGate::deadline
//! [`on_gate_open`]: BootGate::on_gate_open

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

use crate::error::{Result, SerialwireError};
use crate::protocol::DEFAULT_BOOT_DELAY;
use crate::transport::BoxedWriter;

/// Deadline used when the boot delay overflows the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Whether outbound commands are queued or written immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Peer is booting; commands are queued.
    Closed,
    /// Peer is ready; commands go straight to the transport.
    Open,
}

/// Outcome of draining the queue when the gate opens.
#[derive(Debug, Default)]
pub struct GateFlush {
    /// Commands fully written.
    pub written: usize,
    /// Failures for the commands that were not.
    pub failures: Vec<SerialwireError>,
}

/// Boot gate owning the transport write path and the pre-boot queue.
pub struct BootGate<W = BoxedWriter> {
    state: GateState,
    boot_delay: Duration,
    /// Expiry of the pending one-shot boot timer.
    deadline: Option<Instant>,
    queue: VecDeque<Bytes>,
    writer: Option<W>,
}

impl<W> BootGate<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a closed gate with no transport attached.
    pub fn new(boot_delay: Duration) -> Self {
        Self {
            state: GateState::Closed,
            boot_delay,
            deadline: None,
            queue: VecDeque::new(),
            writer: None,
        }
    }

    /// Current gate state.
    #[inline]
    pub fn state(&self) -> GateState {
        self.state
    }

    /// When the pending boot timer expires, if one is armed.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Configured boot delay.
    #[inline]
    pub fn boot_delay(&self) -> Duration {
        self.boot_delay
    }

    /// Number of commands waiting for the gate to open.
    #[inline]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Check if a transport write half is attached.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    /// Reset for a fresh connection.
    ///
    /// Closes the gate, cancels the pending timer and re-arms it from now,
    /// discards queued commands and swaps in `writer` (dropping the old one).
    /// `writer` is `None` when opening the port failed.
    pub fn on_reconnect(&mut self, writer: Option<W>) {
        if !self.queue.is_empty() {
            tracing::debug!(
                discarded = self.queue.len(),
                "Discarding commands queued for previous session"
            );
        }

        self.state = GateState::Closed;
        self.queue.clear();
        self.writer = writer;
        let now = Instant::now();
        self.deadline = Some(now.checked_add(self.boot_delay).unwrap_or(now + FAR_FUTURE));
    }

    /// Detach and return the transport write half.
    pub fn detach(&mut self) -> Option<W> {
        self.writer.take()
    }

    /// Submit one framed command.
    ///
    /// Queued while CLOSED, written immediately while OPEN. Empty frames are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Write failures while OPEN (`NotConnected`, `TransportWrite`,
    /// `PartialWrite`). The gate stays usable either way.
    pub async fn submit(&mut self, frame: Bytes) -> Result<()> {
        if frame.is_empty() {
            return Ok(());
        }

        match self.state {
            GateState::Closed => {
                self.queue.push_back(frame);
                tracing::trace!(queued = self.queue.len(), "Command queued until boot");
                Ok(())
            }
            GateState::Open => self.write_frame(&frame).await,
        }
    }

    /// Open the gate and flush the queue in FIFO order.
    ///
    /// Called when the boot timer expires. Does nothing if already open.
    pub async fn on_gate_open(&mut self) -> GateFlush {
        let mut flush = GateFlush::default();
        if self.state == GateState::Open {
            return flush;
        }

        self.state = GateState::Open;
        self.deadline = None;

        let queued = std::mem::take(&mut self.queue);
        for frame in queued {
            match self.write_frame(&frame).await {
                Ok(()) => flush.written += 1,
                Err(e) => flush.failures.push(e),
            }
        }

        flush
    }

    /// Write one frame to the transport, without retrying.
    async fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(SerialwireError::NotConnected)?;

        let written = writer
            .write(frame)
            .await
            .map_err(SerialwireError::TransportWrite)?;

        if written != frame.len() {
            return Err(SerialwireError::PartialWrite {
                written,
                expected: frame.len(),
            });
        }

        writer
            .flush()
            .await
            .map_err(SerialwireError::TransportWrite)
    }

    #[cfg(test)]
    fn writer_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }
}

impl Default for BootGate<BoxedWriter> {
    fn default() -> Self {
        Self::new(DEFAULT_BOOT_DELAY)
    }
}
