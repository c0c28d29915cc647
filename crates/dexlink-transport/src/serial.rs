//! Serial port transport for receiver communication.
//!
//! This module provides [`SerialTransport`], which implements the
//! [`Transport`] trait over the receiver's USB virtual COM port. The
//! receiver enumerates as CDC-ACM and talks at 115 200 baud, 8N1, no flow
//! control.
//!
//! # Example
//!
//! ```no_run
//! use dexlink_transport::SerialTransport;
//! use dexlink_core::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> dexlink_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyACM0").await?;
//!
//! // Send a composed PING frame.
//! transport.write(&[0x01, 0x06, 0x00, 0x0A, 0x5E, 0x65]).await?;
//!
//! // Read the 4-byte response header.
//! let header = transport.read(4, Duration::from_millis(4300)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};

use dexlink_core::error::{Error, Result};
use dexlink_core::transport::Transport;

/// Baud rate the receiver firmware expects.
pub const RECEIVER_BAUD: u32 = 115_200;

/// Settle delay before the single open retry.
///
/// Right after the cable is plugged in, some hosts enumerate the CDC-ACM
/// port before it is actually usable; the first open then fails even though
/// the device is fine. One retry after this delay rides out the race.
pub const OPEN_SETTLE_DELAY: Duration = Duration::from_secs(18);

/// Serial port configuration.
///
/// The defaults match the receiver: 115 200 baud, 8 data bits, 1 stop bit,
/// no parity, no flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate.
    pub baud_rate: u32,
    /// Whether a failed first open is retried once after
    /// [`OPEN_SETTLE_DELAY`].
    pub retry_open: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: RECEIVER_BAUD,
            retry_open: true,
        }
    }
}

/// Serial port transport to a Dexcom receiver.
pub struct SerialTransport {
    /// The underlying serial stream; `None` once closed.
    port: Option<SerialStream>,
    /// Port name for logging.
    port_name: String,
}

impl SerialTransport {
    /// Open the receiver's serial port with default settings.
    ///
    /// A failed first open is retried exactly once after a fixed settle
    /// delay, with the retry visible in the log. Further retry or backoff
    /// policy belongs to the caller.
    pub async fn open(port: &str) -> Result<Self> {
        Self::open_with_config(port, SerialConfig::default()).await
    }

    /// Open the receiver's serial port with explicit configuration.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        let stream = match Self::try_open(port, config.baud_rate) {
            Ok(stream) => stream,
            Err(first_err) if config.retry_open => {
                warn!(
                    port = %port,
                    error = %first_err,
                    delay_s = OPEN_SETTLE_DELAY.as_secs(),
                    "open failed, retrying once after settle delay"
                );
                tokio::time::sleep(OPEN_SETTLE_DELAY).await;
                Self::try_open(port, config.baud_rate)?
            }
            Err(first_err) => return Err(first_err),
        };

        info!(port = %port, baud = config.baud_rate, "serial port opened");
        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    fn try_open(port: &str, baud_rate: u32) -> Result<SerialStream> {
        let stream = tokio_serial::new(port, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| Error::Transport(format!("failed to open {port}: {e}")))?;
        Ok(stream)
    }

    /// The name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn read(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        let mut out = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            // Each segment gets the full timeout, matching the per-read
            // bound the device has been driven with in the field.
            let read = tokio::time::timeout(timeout, port.read(&mut out[filled..])).await;
            match read {
                Ok(Ok(0)) => {
                    warn!(port = %self.port_name, "serial stream returned EOF");
                    return Err(Error::ConnectionLost);
                }
                Ok(Ok(count)) => filled += count,
                Ok(Err(e)) => {
                    return Err(map_io_error(&self.port_name, e));
                }
                Err(_) => {
                    trace!(
                        port = %self.port_name,
                        wanted = n,
                        got = filled,
                        timeout_ms = timeout.as_millis(),
                        "read timed out"
                    );
                    return Err(Error::Timeout);
                }
            }
        }
        trace!(port = %self.port_name, bytes = n, "read complete");
        Ok(out)
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        port.write_all(data)
            .await
            .map_err(|e| map_io_error(&self.port_name, e))?;
        port.flush()
            .await
            .map_err(|e| map_io_error(&self.port_name, e))?;
        trace!(port = %self.port_name, bytes = data.len(), "write complete");
        Ok(data.len())
    }

    async fn clear_buffers(&mut self) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;
        port.clear(tokio_serial::ClearBuffer::All)
            .map_err(|e| Error::Transport(format!("failed to clear buffers: {e}")))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            debug!(port = %self.port_name, "closing serial port");
            // A cable pulled mid-exchange leaves junk in the OS buffers
            // that can wedge the port on the next open, so drain before
            // releasing the handle. Failures here are logged, not fatal --
            // there may simply be nothing to clean up.
            if let Err(e) = port.clear(tokio_serial::ClearBuffer::All) {
                debug!(port = %self.port_name, error = %e, "clear on close failed");
            }
            if let Err(e) = port.flush().await {
                debug!(port = %self.port_name, error = %e, "flush on close failed");
            }
            info!(port = %self.port_name, "serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

fn map_io_error(port_name: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::BrokenPipe || e.kind() == std::io::ErrorKind::NotConnected {
        warn!(port = %port_name, error = %e, "serial connection lost");
        Error::ConnectionLost
    } else {
        Error::Io(e)
    }
}
