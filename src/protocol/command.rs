//! Command struct with typed field accessors.
//!
//! A [`Command`] is one decoded line: an immutable, ordered list of text
//! fields. Accessors fail loudly on bad indices or unparsable numbers so a
//! desynchronized stream shows up as an error instead of a silent zero.
//!
//! # Example
//!
//! ```
//! use serialwire::protocol::Command;
//!
//! let cmd = Command::from_line("pos 12 -3.5");
//!
//! assert_eq!(cmd.field_count(), 3);
//! assert_eq!(cmd.name(), "pos");
//! assert_eq!(cmd.field_as_integer(1).unwrap(), 12);
//! assert_eq!(cmd.field_as_float(2).unwrap(), -3.5);
//! ```

use std::fmt;
use std::str::FromStr;

use super::wire_format::{split_fields, SEPARATOR};
use crate::error::{Result, SerialwireError};

/// One decoded protocol command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    fields: Vec<String>,
}

impl Command {
    /// Create a command from already-split fields.
    ///
    /// An empty vector is normalized to a single empty field, which is what a
    /// blank line decodes to.
    pub fn new(fields: Vec<String>) -> Self {
        if fields.is_empty() {
            return Self {
                fields: vec![String::new()],
            };
        }
        Self { fields }
    }

    /// Decode a line (without terminator) into a command.
    pub fn from_line(line: &str) -> Self {
        Self {
            fields: split_fields(line),
        }
    }

    /// Number of fields. Always at least 1.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// All fields in order.
    #[inline]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// First field, conventionally the command name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.fields[0]
    }

    /// Text of field `index`.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index >= field_count()`.
    pub fn field(&self, index: usize) -> Result<&str> {
        self.fields
            .get(index)
            .map(String::as_str)
            .ok_or(SerialwireError::IndexOutOfRange {
                index,
                len: self.fields.len(),
            })
    }

    /// Parse field `index` as any `FromStr` type.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` for a bad index, `MalformedField` if parsing fails.
    pub fn field_as<T: FromStr>(&self, index: usize) -> Result<T> {
        let value = self.field(index)?;
        value.parse().map_err(|_| SerialwireError::MalformedField {
            index,
            value: value.to_owned(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Parse field `index` as a signed integer.
    pub fn field_as_integer(&self, index: usize) -> Result<i64> {
        self.field_as(index)
    }

    /// Parse field `index` as a floating-point number.
    pub fn field_as_float(&self, index: usize) -> Result<f64> {
        self.field_as(index)
    }
}

/// Renders the wire line without its terminator.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", SEPARATOR as char)?;
            }
            f.write_str(field)?;
        }
        Ok(())
    }
}
