//! Transport trait for receiver communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a Dexcom
//! receiver. The real implementation wraps a USB virtual COM port
//! (`dexlink-transport`); tests use the deterministic `MockTransport` from
//! the `dexlink-test-harness` crate.
//!
//! The protocol layers operate on a `Transport` rather than directly on a
//! serial port, so the framing, page-store, and record-decoding logic can be
//! exercised without hardware.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Byte-level transport to a receiver.
///
/// The link is half-duplex and strictly command/response: the receiver only
/// ever transmits in reply to a request, so the interface is an exact-length
/// read rather than a streaming one. Implementations must not be shared
/// between threads without external serialization; the command channel in
/// `dexlink-protocol` provides that lock.
#[async_trait]
pub trait Transport: Send {
    /// Read exactly `n` bytes from the receiver.
    ///
    /// Waits up to `timeout` for each segment to arrive. Returns
    /// [`Error::Timeout`](crate::error::Error::Timeout) if the receiver does
    /// not deliver `n` bytes within the deadline; a short read never returns
    /// a partial buffer.
    async fn read(&mut self, n: usize, timeout: Duration) -> Result<Vec<u8>>;

    /// Write raw bytes to the receiver, returning the count written.
    ///
    /// Implementations block until all bytes have reached the OS transmit
    /// buffer and have been flushed toward the device.
    async fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Discard anything sitting in the input and output buffers.
    ///
    /// Called before every exchange: the receiver cannot multiplex, so any
    /// stale bytes are leftovers from an interrupted exchange and would
    /// corrupt the next response.
    async fn clear_buffers(&mut self) -> Result<()>;

    /// Close the transport.
    ///
    /// Idempotent. Implementations drain and flush before releasing the
    /// handle so a future reconnect does not inherit stale bytes; subsequent
    /// `read`/`write` calls return
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
