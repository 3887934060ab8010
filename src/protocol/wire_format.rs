//! Wire format constants and field splitting.
//!
//! Every command is one line of ASCII text:
//! ```text
//! ┌────────┬───┬────────┬───┬─────┬───┬────────┬────┐
//! │ field0 │ ␠ │ field1 │ ␠ │ ... │ ␠ │ fieldN │ \n │
//! └────────┴───┴────────┴───┴─────┴───┴────────┴────┘
//! ```
//!
//! Separators are never collapsed: `"a  b"` has three fields, the middle one
//! empty, and a blank line is a command with a single empty field. Host and
//! peer address fields by position, so both ends must split identically.

use std::time::Duration;

/// Line terminator byte.
pub const TERMINATOR: u8 = b'\n';

/// Field separator byte.
pub const SEPARATOR: u8 = b' ';

/// Symbol rate of the reference peripheral.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Time the peer needs to reboot after the port is (re)opened.
///
/// Opening the port resets the board, and its bootloader then spends about
/// half a second before the sketch starts listening.
pub const DEFAULT_BOOT_DELAY: Duration = Duration::from_millis(1000);

/// Split one line (terminator already removed) into its fields.
///
/// Empty fields are kept, so the result always holds at least one field.
///
/// # Example
///
/// ```
/// use serialwire::protocol::split_fields;
///
/// assert_eq!(split_fields("2 hearts 3"), vec!["2", "hearts", "3"]);
/// assert_eq!(split_fields("a  b"), vec!["a", "", "b"]);
/// assert_eq!(split_fields(""), vec![""]);
/// ```
pub fn split_fields(line: &str) -> Vec<String> {
    line.split(SEPARATOR as char).map(str::to_owned).collect()
}

/// Position of the first terminator in `data`, if any.
#[inline]
pub fn find_terminator(data: &[u8]) -> Option<usize> {
    data.iter().position(|&b| b == TERMINATOR)
}
