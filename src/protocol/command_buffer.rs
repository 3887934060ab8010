//! Command buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for the byte buffer. The buffer and the offset of
//! the next unconsumed terminator are kept together, and only [`append`] and
//! [`extract_command`] mutate them, so the boundary can never go stale:
//! - `append` sets the boundary if none was pending and new bytes hold a `\n`
//! - `extract_command` consumes one line and rescans for the next `\n`
//!
//! # Example
//!
//! ```
//! use serialwire::protocol::CommandBuffer;
//!
//! let mut buffer = CommandBuffer::new();
//!
//! // Data arrives in arbitrary chunks from the serial port
//! buffer.append(b"a 1\nb");
//! buffer.append(b"\n\nc 2 3");
//!
//! while buffer.has_command() {
//!     let cmd = buffer.extract_command().unwrap();
//!     println!("got {} fields", cmd.field_count());
//! }
//!
//! // "c 2 3" stays buffered until its terminator arrives
//! assert_eq!(buffer.len(), 5);
//! ```
//!
//! [`append`]: CommandBuffer::append
//! [`extract_command`]: CommandBuffer::extract_command

use bytes::{Buf, BytesMut};

use super::wire_format::{find_terminator, TERMINATOR};
use super::Command;
use crate::error::{Result, SerialwireError};

/// Default initial capacity of the byte buffer.
const DEFAULT_CAPACITY: usize = 1024;

/// Buffer for accumulating incoming bytes and extracting complete commands.
pub struct CommandBuffer {
    /// Everything received but not yet consumed.
    buffer: BytesMut,
    /// Offset of the next unconsumed terminator in `buffer`.
    boundary: Option<usize>,
}

impl CommandBuffer {
    /// Create a new command buffer.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new command buffer with custom initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            boundary: None,
        }
    }

    /// Append raw bytes to the buffer.
    ///
    /// Returns the number of terminators in `data`, which is how many
    /// commands this chunk completes.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let old_len = self.buffer.len();
        self.buffer.extend_from_slice(data);

        let terminators = data
            .iter()
            .filter(|&&b| b == TERMINATOR)
            .count();

        if self.boundary.is_none() && terminators > 0 {
            self.boundary = find_terminator(data).map(|pos| old_len + pos);
        }

        terminators
    }

    /// Check whether a complete command is buffered.
    #[inline]
    pub fn has_command(&self) -> bool {
        self.boundary.is_some()
    }

    /// Remove the next complete line from the buffer and decode it.
    ///
    /// # Errors
    ///
    /// Returns `NoCommandAvailable` if [`has_command`](Self::has_command) is false.
    pub fn extract_command(&mut self) -> Result<Command> {
        let end = self.boundary.ok_or(SerialwireError::NoCommandAvailable)?;

        let line = self.buffer.split_to(end);
        self.buffer.advance(1);
        self.boundary = find_terminator(&self.buffer);

        Ok(Command::from_line(&String::from_utf8_lossy(&line)))
    }

    /// Append data and extract every command it completes, in order.
    pub fn push(&mut self, data: &[u8]) -> Vec<Command> {
        self.append(data);

        let mut commands = Vec::new();
        while let Ok(cmd) = self.extract_command() {
            commands.push(cmd);
        }
        commands
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drop all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.boundary = None;
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new()
    }
}
