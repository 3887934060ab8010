//! In-process transport built on `tokio::io::duplex`.
//!
//! Every successful open creates a fresh duplex pair. The link keeps one
//! end, the other is handed to the owner of the connector as a
//! [`MemoryPeer`], which plays the peripheral.
//!
//! # Example
//!
//! ```ignore
//! use serialwire::transport::MemoryConnector;
//! use serialwire::LinkBuilder;
//! use tokio::io::AsyncWriteExt;
//!
//! let (connector, mut peers) = MemoryConnector::new();
//! let (link, mut events) = LinkBuilder::new().connector(connector).start();
//!
//! link.connect("sim0").await?;
//! let mut peer = peers.recv().await.unwrap();
//! peer.stream.write_all(b"ready\n").await?;
//! ```

use std::collections::HashSet;

use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use super::{BoxFuture, BoxedReader, BoxedWriter, Connector};
use crate::config::LinkConfig;

/// Default duplex buffer size.
const DEFAULT_PIPE_CAPACITY: usize = 64 * 1024;

/// The peripheral side of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    /// Port identifier the link opened.
    pub port: String,
    /// Far end of the byte stream.
    pub stream: DuplexStream,
}

/// Connector producing in-memory transports.
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    unavailable: HashSet<String>,
    capacity: usize,
}

impl MemoryConnector {
    /// Create a connector and the receiver of its peers.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MemoryPeer>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers: tx,
            unavailable: HashSet::new(),
            capacity: DEFAULT_PIPE_CAPACITY,
        };
        (connector, rx)
    }

    /// Make opening `port` fail with `NotFound`.
    pub fn with_unavailable(mut self, port: &str) -> Self {
        self.unavailable.insert(port.to_owned());
        self
    }

    /// Set the duplex buffer size.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Connector for MemoryConnector {
    fn open<'a>(
        &'a self,
        port: &'a str,
        _config: &'a LinkConfig,
    ) -> BoxFuture<'a, std::io::Result<(BoxedReader, BoxedWriter)>> {
        Box::pin(async move {
            if self.unavailable.contains(port) {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no such port: {port}"),
                ));
            }

            let (local, remote) = tokio::io::duplex(self.capacity);
            self.peers
                .send(MemoryPeer {
                    port: port.to_owned(),
                    stream: remote,
                })
                .map_err(|_| {
                    std::io::Error::new(std::io::ErrorKind::NotConnected, "peer receiver dropped")
                })?;

            let (reader, writer) = tokio::io::split(local);
            Ok((
                Box::new(reader) as BoxedReader,
                Box::new(writer) as BoxedWriter,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_open_hands_out_peer() {
        let (connector, mut peers) = MemoryConnector::new();
        let config = LinkConfig::default();

        let (mut reader, mut writer) = connector.open("sim0", &config).await.unwrap();
        let mut peer = peers.recv().await.unwrap();
        assert_eq!(peer.port, "sim0");

        writer.write_all(b"ping\n").await.unwrap();
        let mut buf = [0u8; 5];
        peer.stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping\n");

        peer.stream.write_all(b"pong\n").await.unwrap();
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong\n");
    }

    #[tokio::test]
    async fn test_unavailable_port() {
        let (connector, _peers) = MemoryConnector::new();
        let connector = connector.with_unavailable("busy");
        let config = LinkConfig::default();

        let err = connector.open("busy", &config).await.err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(connector.open("free", &config).await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_receiver_fails_open() {
        let (connector, peers) = MemoryConnector::new();
        drop(peers);

        let config = LinkConfig::default();
        assert!(connector.open("sim0", &config).await.is_err());
    }
}
