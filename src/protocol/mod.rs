//! Protocol module - wire format, framing, and command types.
//!
//! This module implements the line protocol spoken over the serial link:
//! - Newline-terminated, space-separated text commands
//! - Command buffer for accumulating partial reads
//! - Command struct with typed accessors
//! - Builder for outbound commands

mod builder;
mod command;
mod command_buffer;
mod wire_format;

pub use builder::{CommandBuilder, Field};
pub use command::Command;
pub use command_buffer::CommandBuffer;
pub use wire_format::{
    find_terminator, split_fields, DEFAULT_BAUD_RATE, DEFAULT_BOOT_DELAY, SEPARATOR, TERMINATOR,
};
