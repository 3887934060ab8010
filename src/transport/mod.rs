//! Transport module - opening the byte-stream channel to the peripheral.
//!
//! The link engine only needs a read half and a write half. A [`Connector`]
//! turns a port identifier into that pair:
//! - [`DeviceConnector`]: a device node such as `/dev/ttyACM0`
//! - [`MemoryConnector`]: an in-process stream, for tests and simulators

mod device;
mod memory;

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::LinkConfig;

pub use device::DeviceConnector;
pub use memory::{MemoryConnector, MemoryPeer};

/// Boxed read half of an open transport.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of an open transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Boxed future returned by connectors.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Opens a named serial channel.
pub trait Connector: Send + Sync + 'static {
    /// Open `port` and return its read and write halves.
    fn open<'a>(
        &'a self,
        port: &'a str,
        config: &'a LinkConfig,
    ) -> BoxFuture<'a, std::io::Result<(BoxedReader, BoxedWriter)>>;
}
