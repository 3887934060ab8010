//! Link configuration.
//!
//! All fields have defaults matching the reference peripheral, so an empty
//! JSON object is a valid configuration:
//!
//! ```
//! use serialwire::LinkConfig;
//!
//! let config = LinkConfig::from_json(r#"{ "port": "/dev/ttyACM0" }"#).unwrap();
//! assert_eq!(config.port.as_deref(), Some("/dev/ttyACM0"));
//! assert_eq!(config.baud_rate, 115_200);
//! assert_eq!(config.boot_delay_ms, 1000);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::protocol::{DEFAULT_BAUD_RATE, DEFAULT_BOOT_DELAY};

/// Default size of a single transport read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Default capacity of the consumer event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default capacity of the request channel into the session task.
pub const DEFAULT_REQUEST_CAPACITY: usize = 256;

/// Configuration for a serial link session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port to connect to on start, if any.
    pub port: Option<String>,
    /// Symbol rate requested from the transport.
    pub baud_rate: u32,
    /// Boot window after every (re)connect, in milliseconds.
    pub boot_delay_ms: u64,
    /// Maximum bytes taken from the transport per read.
    pub read_buffer_size: usize,
    /// Capacity of the consumer event channel.
    pub event_capacity: usize,
    /// Capacity of the request channel.
    pub request_capacity: usize,
}

impl LinkConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Serialize to pretty JSON, e.g. to persist the last used port.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Boot window as a `Duration`.
    #[inline]
    pub fn boot_delay(&self) -> Duration {
        Duration::from_millis(self.boot_delay_ms)
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            boot_delay_ms: DEFAULT_BOOT_DELAY.as_millis() as u64,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            request_capacity: DEFAULT_REQUEST_CAPACITY,
        }
    }
}
