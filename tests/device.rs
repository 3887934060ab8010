//! Device transport tests over a pseudo-terminal.
//!
//! The pty master plays the board; the link opens the slave side through
//! the default device connector.

#![cfg(target_os = "linux")]

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::time::Duration;

use nix::fcntl::OFlag;
use nix::pty::{grantpt, posix_openpt, ptsname_r, unlockpt, PtyMaster};
use serialwire::{CommandBuilder, LinkBuilder, LinkEvent};

fn open_pty() -> (PtyMaster, String) {
    let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).unwrap();
    grantpt(&master).unwrap();
    unlockpt(&master).unwrap();
    let slave = ptsname_r(&master).unwrap();
    (master, slave)
}

/// Keeps the slave side alive while the link closes and reopens it.
fn hold_slave(path: &str) -> File {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(nix::libc::O_NOCTTY)
        .open(path)
        .unwrap()
}

/// Test bytes sent after a reconnect reach the new session, not a reader
/// left over from the previous one.
#[tokio::test]
async fn test_reconnect_releases_previous_port() {
    let (mut master, slave) = open_pty();
    let _held = hold_slave(&slave);

    let (link, mut events) = LinkBuilder::new()
        .boot_delay(Duration::from_millis(10))
        .start();

    link.connect(&slave).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    link.reconnect().await.unwrap();

    master.write_all(b"hello 1\n").unwrap();

    let cmd = tokio::time::timeout(Duration::from_secs(2), events.next_command())
        .await
        .expect("command lost after reconnect")
        .unwrap();
    assert_eq!(cmd.fields(), ["hello", "1"]);
}

/// Test a command queued during boot reaches the board once the gate opens.
#[tokio::test]
async fn test_boot_queue_over_device() {
    let (master, slave) = open_pty();

    let (link, mut events) = LinkBuilder::new()
        .port(&slave)
        .boot_delay(Duration::from_millis(200))
        .start();

    link.send(&CommandBuilder::command("ready")).await.unwrap();

    loop {
        match events.recv().await {
            Some(LinkEvent::GateOpened { flushed }) => {
                assert_eq!(flushed, 1);
                break;
            }
            other => panic!("expected GateOpened, got {other:?}"),
        }
    }

    let received = tokio::task::spawn_blocking(move || {
        let mut master = master;
        let mut out = [0u8; 6];
        std::io::Read::read_exact(&mut master, &mut out).map(|_| out)
    });
    let out = tokio::time::timeout(Duration::from_secs(2), received)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(&out, b"ready\n");
}
