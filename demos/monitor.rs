//! Serial monitor - print every command a board sends.
//!
//! This example demonstrates:
//! - Loading a link configuration from JSON
//! - Connecting to a real device node
//! - Consuming link events
//!
//! # Running
//!
//! ```text
//! RUST_LOG=serialwire=debug cargo run --example monitor -- /dev/ttyACM0
//! ```
//!
//! An optional second argument names a JSON config file.

use serialwire::{CommandBuilder, LinkBuilder, LinkConfig, LinkEvent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let port = args.next().unwrap_or_else(|| "/dev/ttyACM0".to_string());
    let config = match args.next() {
        Some(path) => LinkConfig::load(path)?,
        None => LinkConfig::default(),
    };

    let (link, mut events) = LinkBuilder::from_config(config).start();
    link.connect(&port).await?;

    // Queued until the board has finished booting
    link.send(&CommandBuilder::command("status")).await?;

    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::CommandReady(cmd) => println!("{cmd}"),
            LinkEvent::GateOpened { flushed } => {
                tracing::info!(flushed, "Board ready");
            }
            LinkEvent::TransportError(e) => {
                tracing::error!(error = %e, "Link error");
            }
        }
    }

    Ok(())
}
