//! Link session builder and control loop.
//!
//! The [`LinkBuilder`] configures the link and spawns a single control task.
//! That task owns every piece of mutable protocol state (command buffer,
//! boot gate, send queue) and processes one event at a time:
//!
//! ```text
//! reader task ── DataAvailable / Error / Closed ─┐
//! boot timer ─── expiry ─────────────────────────┼─► control task ─► LinkEvents
//! Link handles ─ connect / submit / status ──────┘        │
//!                                                         └─► BootGate ─► transport
//! ```
//!
//! Each read event is fully drained before the next event is looked at, so
//! a chunk holding K terminators yields exactly K `CommandReady` events, in
//! arrival order.
//!
//! # Example
//!
//! ```ignore
//! use serialwire::{CommandBuilder, LinkBuilder, LinkEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (link, mut events) = LinkBuilder::new().start();
//!     link.connect("/dev/ttyACM0").await?;
//!
//!     // Queued until the board has booted
//!     link.send(CommandBuilder::command("up").append(1)).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let LinkEvent::CommandReady(cmd) = event {
//!             println!("{cmd}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::LinkConfig;
use crate::error::{Result, SerialwireError};
use crate::gate::{BootGate, GateState};
use crate::protocol::{Command, CommandBuffer, CommandBuilder};
use crate::transport::{BoxedReader, Connector, DeviceConnector};

/// Capacity of the channel between reader tasks and the control task.
const TRANSPORT_CHANNEL_CAPACITY: usize = 64;

/// Notification delivered to the consumer of a link.
#[derive(Debug)]
pub enum LinkEvent {
    /// One complete inbound command.
    CommandReady(Command),
    /// A non-fatal transport failure. The link stays usable.
    TransportError(SerialwireError),
    /// The boot window ended; `flushed` queued commands were written.
    GateOpened { flushed: usize },
}

/// Snapshot of the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkStatus {
    /// Last port a connect was attempted on.
    pub port: Option<String>,
    /// Whether a transport is attached.
    pub connected: bool,
    /// Boot gate state.
    pub gate: GateState,
    /// Commands waiting for the gate to open.
    pub queued: usize,
}

/// Builder for configuring and starting a link session.
pub struct LinkBuilder {
    config: LinkConfig,
    connector: Option<Arc<dyn Connector>>,
}

impl LinkBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::from_config(LinkConfig::default())
    }

    /// Create a builder from a loaded configuration.
    pub fn from_config(config: LinkConfig) -> Self {
        Self {
            config,
            connector: None,
        }
    }

    /// Use a custom transport connector.
    ///
    /// Default: [`DeviceConnector`].
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Connect to `port` as soon as the session starts.
    pub fn port(mut self, port: &str) -> Self {
        self.config.port = Some(port.to_owned());
        self
    }

    /// Set the baud rate passed to the connector.
    ///
    /// Default: 115200
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    /// Set the boot window after every (re)connect.
    ///
    /// Default: 1 second
    pub fn boot_delay(mut self, delay: Duration) -> Self {
        self.config.boot_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the maximum bytes taken per transport read.
    ///
    /// Default: 4096
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Set the consumer event channel capacity.
    ///
    /// Default: 256
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Spawn the control task.
    ///
    /// If a port is configured a connect is issued right away; a failure is
    /// reported on the event channel.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> (Link, LinkEvents) {
        let (request_tx, request_rx) = mpsc::channel(self.config.request_capacity.max(1));
        let (event_tx, event_rx) = mpsc::channel(self.config.event_capacity.max(1));
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_CHANNEL_CAPACITY);

        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(DeviceConnector) as Arc<dyn Connector>);

        let session = Session::new(self.config, connector, event_tx, transport_tx);
        tokio::spawn(session.run(request_rx, transport_rx));

        (Link { tx: request_tx }, LinkEvents { rx: event_rx })
    }
}

impl Default for LinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running link session.
///
/// Cheap to clone. The session stops once every handle is dropped.
#[derive(Clone)]
pub struct Link {
    tx: mpsc::Sender<Request>,
}

impl Link {
    /// Create a new link builder.
    pub fn builder() -> LinkBuilder {
        LinkBuilder::new()
    }

    /// Open `port`, closing any previously open one.
    ///
    /// The boot gate closes and its timer restarts whether or not the open
    /// succeeds; commands queued for the previous connection are discarded.
    ///
    /// # Errors
    ///
    /// `TransportOpen` if the port cannot be opened (also reported as an
    /// event). The link stays usable and can be pointed at another port.
    pub async fn connect(&self, port: &str) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Connect {
            port: port.to_owned(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SerialwireError::SessionClosed)?
    }

    /// Re-open the last port.
    ///
    /// # Errors
    ///
    /// `NotConnected` if no port was ever given, else as [`connect`](Self::connect).
    pub async fn reconnect(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Reconnect { reply }).await?;
        rx.await.map_err(|_| SerialwireError::SessionClosed)?
    }

    /// Submit framed bytes for sending.
    ///
    /// Returns once the session has accepted the frame. Write failures are
    /// reported as [`LinkEvent::TransportError`].
    pub async fn submit(&self, frame: Bytes) -> Result<()> {
        self.request(Request::Submit(frame)).await
    }

    /// Render `command` and submit it. Empty builders are not sent.
    pub async fn send(&self, command: &CommandBuilder) -> Result<()> {
        if command.is_empty() {
            return Ok(());
        }
        self.submit(command.finish()).await
    }

    /// Snapshot of the session state.
    pub async fn status(&self) -> Result<LinkStatus> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Status { reply }).await?;
        rx.await.map_err(|_| SerialwireError::SessionClosed)
    }

    /// Current boot gate state.
    pub async fn gate_state(&self) -> Result<GateState> {
        Ok(self.status().await?.gate)
    }

    async fn request(&self, request: Request) -> Result<()> {
        self.tx
            .send(request)
            .await
            .map_err(|_| SerialwireError::SessionClosed)
    }
}

/// Receiver of link notifications.
///
/// Must be drained; the control task waits when the channel is full.
pub struct LinkEvents {
    rx: mpsc::Receiver<LinkEvent>,
}

impl LinkEvents {
    /// Wait for the next event. `None` once the session has stopped.
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is ready.
    pub fn try_recv(&mut self) -> Option<LinkEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next inbound command, skipping other events.
    pub async fn next_command(&mut self) -> Option<Command> {
        while let Some(event) = self.rx.recv().await {
            if let LinkEvent::CommandReady(command) = event {
                return Some(command);
            }
        }
        None
    }
}

/// Requests from [`Link`] handles.
enum Request {
    Connect {
        port: String,
        reply: oneshot::Sender<Result<()>>,
    },
    Reconnect {
        reply: oneshot::Sender<Result<()>>,
    },
    Submit(Bytes),
    Status {
        reply: oneshot::Sender<LinkStatus>,
    },
}

/// Event from a reader task.
enum TransportEvent {
    DataAvailable(Bytes),
    Error(std::io::Error),
    Closed,
}

/// Transport event tagged with the connection it came from.
struct Tagged {
    generation: u64,
    event: TransportEvent,
}

/// State owned by the control task.
struct Session {
    config: LinkConfig,
    connector: Arc<dyn Connector>,
    framer: CommandBuffer,
    gate: BootGate,
    port: Option<String>,
    /// Bumped on every connect; older reader events are stale.
    generation: u64,
    reader_task: Option<JoinHandle<()>>,
    events: mpsc::Sender<LinkEvent>,
    transport_tx: mpsc::Sender<Tagged>,
}

impl Session {
    fn new(
        config: LinkConfig,
        connector: Arc<dyn Connector>,
        events: mpsc::Sender<LinkEvent>,
        transport_tx: mpsc::Sender<Tagged>,
    ) -> Self {
        let gate = BootGate::new(config.boot_delay());
        Self {
            config,
            connector,
            framer: CommandBuffer::new(),
            gate,
            port: None,
            generation: 0,
            reader_task: None,
            events,
            transport_tx,
        }
    }

    /// Main control loop.
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        mut transport_rx: mpsc::Receiver<Tagged>,
    ) {
        if let Some(port) = self.config.port.clone() {
            // Failure is already reported as an event
            let _ = self.connect(port).await;
        }

        loop {
            let deadline = self.gate.deadline();

            // Inbound data can be ready on every iteration, so it goes last
            // to keep the boot timer and handle requests from starving.
            tokio::select! {
                biased;

                _ = boot_timer(deadline) => {
                    self.on_boot_finished().await;
                }

                request = requests.recv() => match request {
                    Some(request) => self.on_request(request).await,
                    None => break,
                },

                Some(tagged) = transport_rx.recv() => {
                    self.on_transport_event(tagged).await;
                }
            }
        }

        self.close_transport();
        tracing::debug!("Link session stopped");
    }

    async fn on_request(&mut self, request: Request) {
        match request {
            Request::Connect { port, reply } => {
                let result = self.connect(port).await;
                let _ = reply.send(result);
            }
            Request::Reconnect { reply } => {
                let result = match self.port.clone() {
                    Some(port) => self.connect(port).await,
                    None => Err(SerialwireError::NotConnected),
                };
                let _ = reply.send(result);
            }
            Request::Submit(frame) => {
                if let Err(e) = self.gate.submit(frame).await {
                    self.report(e).await;
                }
            }
            Request::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    /// Close the current port, open `port` and reset the boot gate.
    async fn connect(&mut self, port: String) -> Result<()> {
        self.close_transport();
        self.generation += 1;
        self.framer.clear();
        self.port = Some(port.clone());

        let opened = self.connector.open(&port, &self.config).await;
        match opened {
            Ok((reader, writer)) => {
                self.reader_task = Some(tokio::spawn(read_loop(
                    reader,
                    self.generation,
                    self.config.read_buffer_size.max(1),
                    self.transport_tx.clone(),
                )));
                self.gate.on_reconnect(Some(writer));

                tracing::info!(
                    port = %port,
                    boot_delay_ms = self.config.boot_delay_ms,
                    "Serial port opened, waiting for peer boot"
                );
                Ok(())
            }
            Err(source) => {
                // The boot timer is armed anyway; queued commands will then
                // surface as NotConnected instead of vanishing.
                self.gate.on_reconnect(None);

                let reported = SerialwireError::TransportOpen {
                    port: port.clone(),
                    source: std::io::Error::new(source.kind(), source.to_string()),
                };
                self.report(reported).await;

                Err(SerialwireError::TransportOpen { port, source })
            }
        }
    }

    fn close_transport(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        drop(self.gate.detach());
    }

    async fn on_transport_event(&mut self, tagged: Tagged) {
        if tagged.generation != self.generation {
            tracing::trace!(generation = tagged.generation, "Dropping stale transport event");
            return;
        }

        match tagged.event {
            TransportEvent::DataAvailable(data) => {
                self.framer.append(&data);

                while self.framer.has_command() {
                    let Ok(command) = self.framer.extract_command() else {
                        break;
                    };
                    self.emit(LinkEvent::CommandReady(command)).await;
                }
            }
            TransportEvent::Error(e) => {
                self.reader_task = None;
                self.report(SerialwireError::TransportRead(e)).await;
            }
            TransportEvent::Closed => {
                self.reader_task = None;
                self.report(SerialwireError::ConnectionClosed).await;
            }
        }
    }

    async fn on_boot_finished(&mut self) {
        let flush = self.gate.on_gate_open().await;

        tracing::debug!(
            flushed = flush.written,
            failed = flush.failures.len(),
            "Peer boot window elapsed"
        );

        for e in flush.failures {
            self.report(e).await;
        }
        self.emit(LinkEvent::GateOpened {
            flushed: flush.written,
        })
        .await;
    }

    fn status(&self) -> LinkStatus {
        LinkStatus {
            port: self.port.clone(),
            connected: self.gate.is_connected(),
            gate: self.gate.state(),
            queued: self.gate.queued(),
        }
    }

    async fn report(&mut self, error: SerialwireError) {
        tracing::warn!(error = %error, "Serial link error");
        self.emit(LinkEvent::TransportError(error)).await;
    }

    async fn emit(&mut self, event: LinkEvent) {
        if self.events.send(event).await.is_err() {
            tracing::trace!("Link event receiver dropped");
        }
    }
}

/// Resolves when the boot timer expires; never if none is armed.
async fn boot_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Per-connection reader - forwards everything it reads to the control task.
async fn read_loop(
    mut reader: BoxedReader,
    generation: u64,
    buffer_size: usize,
    tx: mpsc::Sender<Tagged>,
) {
    let mut buf = vec![0u8; buffer_size];

    loop {
        let event = match reader.read(&mut buf).await {
            Ok(0) => TransportEvent::Closed,
            Ok(n) => TransportEvent::DataAvailable(Bytes::copy_from_slice(&buf[..n])),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => TransportEvent::Error(e),
        };

        let last = !matches!(event, TransportEvent::DataAvailable(_));
        if tx.send(Tagged { generation, event }).await.is_err() || last {
            return;
        }
    }
}
