//! # serialwire
//!
//! Line-oriented command protocol engine for microcontroller serial links.
//!
//! A serial port is a bare byte stream: no message boundaries, no flow
//! control, and on Arduino-class boards opening it reboots the peer. This
//! crate turns that stream into ordered, discrete commands and back.
//!
//! ## Architecture
//!
//! - **Protocol** ([`protocol`]): `\n`-terminated lines of space-separated
//!   fields, an incremental [`CommandBuffer`] and a [`CommandBuilder`]
//! - **Boot gate** ([`gate`]): holds outbound commands while the peer boots
//!   and flushes them in order once it is ready
//! - **Session** ([`Link`]): a single control task wiring transport reads,
//!   the boot timer and outbound requests together
//!
//! ## Example
//!
//! ```ignore
//! use serialwire::{CommandBuilder, LinkBuilder};
//!
//! #[tokio::main]
//! async fn main() -> serialwire::Result<()> {
//!     let (link, mut events) = LinkBuilder::new().port("/dev/ttyACM0").start();
//!
//!     let mut cmd = CommandBuilder::new();
//!     cmd.append("2").append("hearts").append(3);
//!     link.send(&cmd).await?;
//!
//!     while let Some(cmd) = events.next_command().await {
//!         println!("{} -> {} fields", cmd.name(), cmd.field_count());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod protocol;
pub mod transport;

mod session;

pub use config::LinkConfig;
pub use error::{Result, SerialwireError};
pub use gate::GateState;
pub use protocol::{Command, CommandBuffer, CommandBuilder, Field};
pub use session::{Link, LinkBuilder, LinkEvent, LinkEvents, LinkStatus};
