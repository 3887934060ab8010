//! Serial device transport.
//!
//! Opens a tty node such as `/dev/ttyACM0` non-blocking, switches it to raw
//! 8N1 at the configured baud rate and drives it from the tokio reactor.
//! Both halves share one descriptor; it is closed when the last half drops,
//! and a read parked on it is cancelled by dropping the reader.
//!
//! # Example
//!
//! ```ignore
//! use serialwire::transport::DeviceConnector;
//! use serialwire::LinkBuilder;
//!
//! let (link, events) = LinkBuilder::new()
//!     .connector(DeviceConnector)
//!     .baud_rate(115_200)
//!     .start();
//! link.connect("/dev/ttyACM0").await?;
//! ```

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use nix::sys::termios::{
    cfmakeraw, cfsetspeed, tcflush, tcgetattr, tcsetattr, BaudRate, ControlFlags, FlushArg,
    SetArg, SpecialCharacterIndices,
};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::{BoxFuture, BoxedReader, BoxedWriter, Connector};
use crate::config::LinkConfig;

/// Connector for serial device nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceConnector;

impl Connector for DeviceConnector {
    fn open<'a>(
        &'a self,
        port: &'a str,
        config: &'a LinkConfig,
    ) -> BoxFuture<'a, io::Result<(BoxedReader, BoxedWriter)>> {
        Box::pin(async move {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(nix::libc::O_NOCTTY | nix::libc::O_NONBLOCK)
                .open(port)?;

            configure_line(&file, config.baud_rate)?;

            let fd = Arc::new(AsyncFd::new(file)?);
            tracing::debug!(port, baud_rate = config.baud_rate, "Opened serial device");

            Ok((
                Box::new(SerialReader(Arc::clone(&fd))) as BoxedReader,
                Box::new(SerialWriter(fd)) as BoxedWriter,
            ))
        })
    }
}

/// Raw mode, 8N1, no flow control, discard anything left from before open.
fn configure_line(file: &File, baud_rate: u32) -> io::Result<()> {
    let speed = baud(baud_rate)?;
    let mut termios = tcgetattr(file)?;

    cfmakeraw(&mut termios);
    cfsetspeed(&mut termios, speed)?;
    termios.control_flags.insert(ControlFlags::CLOCAL | ControlFlags::CREAD);
    termios.control_flags.remove(ControlFlags::CSTOPB);
    #[cfg(target_os = "linux")]
    termios.control_flags.remove(ControlFlags::CRTSCTS);
    termios.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
    termios.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

    tcsetattr(file, SetArg::TCSANOW, &termios)?;
    tcflush(file, FlushArg::TCIOFLUSH)?;
    Ok(())
}

fn baud(rate: u32) -> io::Result<BaudRate> {
    let speed = match rate {
        1200 => BaudRate::B1200,
        2400 => BaudRate::B2400,
        4800 => BaudRate::B4800,
        9600 => BaudRate::B9600,
        19_200 => BaudRate::B19200,
        38_400 => BaudRate::B38400,
        57_600 => BaudRate::B57600,
        115_200 => BaudRate::B115200,
        230_400 => BaudRate::B230400,
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported baud rate {other}"),
            ))
        }
    };
    Ok(speed)
}

/// Read half of an open device.
struct SerialReader(Arc<AsyncFd<File>>);

impl AsyncRead for SerialReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            let mut guard = ready!(self.0.poll_read_ready(cx))?;

            let unfilled = buf.initialize_unfilled();
            match guard.try_io(|inner| inner.get_ref().read(unfilled)) {
                Ok(Ok(len)) => {
                    buf.advance(len);
                    return Poll::Ready(Ok(()));
                }
                Ok(Err(err)) => return Poll::Ready(Err(err)),
                Err(_would_block) => continue,
            }
        }
    }
}

/// Write half of an open device.
struct SerialWriter(Arc<AsyncFd<File>>);

impl AsyncWrite for SerialWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        loop {
            let mut guard = ready!(self.0.poll_write_ready(cx))?;

            match guard.try_io(|inner| inner.get_ref().write(buf)) {
                Ok(result) => return Poll::Ready(result),
                Err(_would_block) => continue,
            }
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
