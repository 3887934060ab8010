//! Outbound command builder.
//!
//! Assembles one command from typed fields and renders it to wire bytes.
//! The builder performs no I/O; hand the result of [`CommandBuilder::finish`]
//! to [`Link::submit`](crate::Link::submit) or use
//! [`Link::send`](crate::Link::send).
//!
//! # Example
//!
//! ```
//! use serialwire::protocol::CommandBuilder;
//!
//! let mut builder = CommandBuilder::new();
//! builder.append("2").append("hearts").append(3);
//!
//! assert_eq!(&builder.finish()[..], b"2 hearts 3\n");
//! ```

use std::fmt;

use bytes::Bytes;

use super::wire_format::{SEPARATOR, TERMINATOR};

/// A single outbound field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Canonical decimal text of the field.
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Text(s) => f.write_str(s),
            Field::Integer(n) => write!(f, "{n}"),
            Field::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Text(value.to_owned())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Text(value)
    }
}

impl From<&String> for Field {
    fn from(value: &String) -> Self {
        Field::Text(value.clone())
    }
}

macro_rules! integer_field {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Field {
                fn from(value: $ty) -> Self {
                    Field::Integer(i64::from(value))
                }
            }
        )*
    };
}

integer_field!(i8, i16, i32, i64, u8, u16, u32);

// Values past the i64 range keep their exact decimal text
macro_rules! wide_integer_field {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Field {
                fn from(value: $ty) -> Self {
                    match i64::try_from(value) {
                        Ok(n) => Field::Integer(n),
                        Err(_) => Field::Text(value.to_string()),
                    }
                }
            }
        )*
    };
}

wide_integer_field!(u64, usize, isize, i128, u128);

impl From<f32> for Field {
    fn from(value: f32) -> Self {
        // Widen through the shortest f32 text so 0.1f32 stays "0.1"
        let widened = value.to_string().parse().unwrap_or(f64::from(value));
        Field::Float(widened)
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::Float(value)
    }
}

/// Builder for one outbound command line.
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    /// Rendered fields joined by separators, no terminator.
    line: String,
    /// Number of appended fields.
    count: usize,
}

impl CommandBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder whose first field is `name`.
    pub fn command(name: &str) -> Self {
        let mut builder = Self::new();
        builder.append(name);
        builder
    }

    /// Discard any fields appended so far.
    pub fn begin(&mut self) -> &mut Self {
        self.line.clear();
        self.count = 0;
        self
    }

    /// Append one field, preceded by a separator unless it is the first.
    pub fn append(&mut self, field: impl Into<Field>) -> &mut Self {
        if self.count != 0 {
            self.line.push(SEPARATOR as char);
        }
        let field: Field = field.into();
        self.line.push_str(&field.to_string());
        self.count += 1;
        self
    }

    /// Number of fields appended since the last `begin`.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.count
    }

    /// Check if no field has been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Render the command to wire bytes.
    ///
    /// Appends a terminator unless the rendered text already ends with one.
    /// A builder with no fields renders to empty bytes. Does not consume the
    /// builder, so calling it twice yields the same bytes.
    pub fn finish(&self) -> Bytes {
        if self.count == 0 {
            return Bytes::new();
        }

        let mut out = Vec::with_capacity(self.line.len() + 1);
        out.extend_from_slice(self.line.as_bytes());
        if out.last() != Some(&TERMINATOR) {
            out.push(TERMINATOR);
        }
        Bytes::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CommandBuffer;

    #[test]
    fn test_build_mixed_fields() {
        let mut builder = CommandBuilder::new();
        builder.append("servo").append(3u8).append(-12).append(0.5);

        assert_eq!(builder.field_count(), 4);
        assert_eq!(&builder.finish()[..], b"servo 3 -12 0.5\n");
    }

    #[test]
    fn test_single_field_has_no_separator() {
        let builder = CommandBuilder::command("reset");
        assert_eq!(&builder.finish()[..], b"reset\n");
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut builder = CommandBuilder::new();
        builder.append("up").append(1);

        let first = builder.finish();
        let second = builder.finish();
        assert_eq!(first, second);
        assert_eq!(&first[..], b"up 1\n");
    }

    #[test]
    fn test_begin_clears_previous_fields() {
        let mut builder = CommandBuilder::command("old");
        builder.append(42);

        builder.begin().append("new");
        assert_eq!(builder.field_count(), 1);
        assert_eq!(&builder.finish()[..], b"new\n");
    }

    #[test]
    fn test_no_double_terminator() {
        let mut builder = CommandBuilder::new();
        builder.append("line\n");
        assert_eq!(&builder.finish()[..], b"line\n");
    }

    #[test]
    fn test_empty_builder_renders_nothing() {
        let builder = CommandBuilder::new();
        assert!(builder.is_empty());
        assert!(builder.finish().is_empty());
    }

    #[test]
    fn test_empty_fields_are_kept() {
        let mut builder = CommandBuilder::new();
        builder.append("").append("a").append("").append("");
        assert_eq!(&builder.finish()[..], b" a  \n");

        let mut single = CommandBuilder::new();
        single.append("");
        assert_eq!(&single.finish()[..], b"\n");
    }

    #[test]
    fn test_float_canonical_text() {
        assert_eq!(Field::from(3.0f64).to_string(), "3");
        assert_eq!(Field::from(0.1f64).to_string(), "0.1");
        assert_eq!(Field::from(-2.5f32).to_string(), "-2.5");
        assert_eq!(Field::from(0.1f32).to_string(), "0.1");
        assert_eq!(Field::from(u32::MAX).to_string(), "4294967295");
    }

    #[test]
    fn test_wide_integers() {
        let items = vec!["a", "b", "c"];
        let mut builder = CommandBuilder::command("count");
        builder.append(items.len()).append(-1isize).append(u64::MAX);
        assert_eq!(&builder.finish()[..], b"count 3 -1 18446744073709551615\n");

        assert_eq!(Field::from(7u64), Field::Integer(7));
        assert_eq!(Field::from(i128::MIN).to_string(), i128::MIN.to_string());
        assert_eq!(Field::from(u128::MAX).to_string(), u128::MAX.to_string());
    }

    #[test]
    fn test_build_then_decode() {
        let mut builder = CommandBuilder::new();
        builder.append("pos").append(7).append("").append(1.25);

        let mut buffer = CommandBuffer::new();
        let commands = buffer.push(&builder.finish());

        assert_eq!(commands.len(), 1);
        let cmd = &commands[0];
        assert_eq!(cmd.name(), "pos");
        assert_eq!(cmd.field_as_integer(1).unwrap(), 7);
        assert_eq!(cmd.field(2).unwrap(), "");
        assert_eq!(cmd.field_as_float(3).unwrap(), 1.25);
    }
}
