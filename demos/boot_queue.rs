//! Boot queue - commands sent during the boot window.
//!
//! This example demonstrates:
//! - Simulating a board with the in-memory transport
//! - Commands issued before the board is ready being held, then flushed in order

use std::time::Duration;

use serialwire::transport::MemoryConnector;
use serialwire::{CommandBuilder, LinkBuilder, LinkEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("serialwire=debug,boot_queue=info"))
        .init();

    let (connector, mut peers) = MemoryConnector::new();
    let (link, mut events) = LinkBuilder::new()
        .connector(connector)
        .boot_delay(Duration::from_millis(300))
        .start();

    link.connect("sim0").await?;
    let peer = peers.recv().await.ok_or("no peer")?;

    // Simulated board: answer every line with "ack <line>"
    tokio::spawn(async move {
        let (read, mut write) = tokio::io::split(peer.stream);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::info!(%line, "Board received");
            if write.write_all(format!("ack {line}\n").as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut cmd = CommandBuilder::new();
    cmd.append(2).append("hearts").append(3);
    link.send(&cmd).await?;
    cmd.begin().append("up").append(1);
    link.send(&cmd).await?;

    let mut acks = 0;
    while let Some(event) = events.recv().await {
        match event {
            LinkEvent::GateOpened { flushed } => {
                tracing::info!(flushed, "Boot window over");
            }
            LinkEvent::CommandReady(reply) => {
                tracing::info!(reply = %reply, fields = reply.field_count(), "Reply");
                acks += 1;
                if acks == 2 {
                    break;
                }
            }
            LinkEvent::TransportError(e) => return Err(e.into()),
        }
    }

    Ok(())
}
