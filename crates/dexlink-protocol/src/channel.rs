//! The command channel: one synchronous request/response exchange at a time.
//!
//! The receiver firmware cannot multiplex -- a second command written before
//! the first response has fully drained corrupts both exchanges. The
//! [`CommandChannel`] therefore owns the transport behind a mutex and holds
//! the lock across the whole exchange: clear buffers, write the request,
//! read and validate the response. Callers on separate tasks or threads may
//! share the channel freely; their `execute` calls serialize.
//!
//! No command is retried inside this layer. Some commands are non-idempotent
//! in intent even though the reads are not, so retry is a caller decision.

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, trace};

use dexlink_core::{Error, Result, Transport};

use crate::commands;
use crate::frame::{self, Chunk, Packet};

/// Per-segment read timeout.
///
/// The receiver answers well under a second when present; 4.3 s absorbs USB
/// scheduling stalls and matches the bound the device has been driven with
/// in the field.
pub const READ_TIMEOUT: Duration = Duration::from_millis(4300);

/// Serialized command/response access to one physical receiver.
pub struct CommandChannel {
    transport: Mutex<Box<dyn Transport>>,
    read_timeout: Duration,
}

impl CommandChannel {
    /// Wrap a transport in a channel using the default read timeout.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self::with_timeout(transport, READ_TIMEOUT)
    }

    /// Wrap a transport with an explicit per-segment read timeout.
    pub fn with_timeout(transport: Box<dyn Transport>, read_timeout: Duration) -> Self {
        CommandChannel {
            transport: Mutex::new(transport),
            read_timeout,
        }
    }

    /// Perform one command/response exchange.
    ///
    /// Holds the channel lock for the full exchange. The first failure --
    /// transport, framing, or CRC -- is propagated as-is; the distinct error
    /// variants let the caller decide between "not a receiver", "noisy
    /// line", and "device absent".
    pub async fn execute(&self, command: u8, payload: &[Chunk<'_>]) -> Result<Packet> {
        let request = frame::compose(command, payload)?;

        let mut transport = self.transport.lock().await;
        transport.clear_buffers().await?;

        trace!(command, bytes = request.len(), "writing command frame");
        transport.write(&request).await?;

        let response = read_packet(transport.as_mut(), self.read_timeout).await?;
        trace!(
            command = response.command,
            payload_len = response.payload.len(),
            "response frame received"
        );
        Ok(response)
    }

    /// Liveness check: send PING and report whether the receiver ACKed.
    pub async fn ping(&self) -> Result<bool> {
        let response = self.execute(commands::PING, &[]).await?;
        Ok(response.is_ack())
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<()> {
        let mut transport = self.transport.lock().await;
        transport.close().await
    }

    /// Whether the underlying transport is connected.
    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }
}

/// Read one response frame from the transport in three bounded segments:
/// 4-byte header, payload, 2-byte CRC.
async fn read_packet(transport: &mut dyn Transport, timeout: Duration) -> Result<Packet> {
    let head = transport.read(4, timeout).await?;
    let header = frame::parse_header(&[head[0], head[1], head[2], head[3]])?;

    let payload_len = header.total_length - frame::MIN_FRAME_LEN;
    let mut whole = head;
    if payload_len > 0 {
        let payload = transport.read(payload_len, timeout).await?;
        whole.extend_from_slice(&payload);
    }
    let crc = transport.read(2, timeout).await?;
    whole.extend_from_slice(&crc);

    match frame::check_frame(header, &whole) {
        Ok(packet) => Ok(packet),
        Err(e) => {
            debug!(error = %e, "response frame rejected");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::frame::compose;
    use dexlink_test_harness::MockTransport;

    /// Compose a response frame the way the receiver would.
    fn response(command: u8, payload: &[u8]) -> Vec<u8> {
        compose(command, &[Chunk::Bytes(payload)]).unwrap()
    }

    #[tokio::test]
    async fn execute_round_trip() {
        let mut mock = MockTransport::new();
        let request = compose(commands::READ_BATTERY_LEVEL, &[]).unwrap();
        mock.expect(&request, &response(commands::ACK, &[87, 0, 0, 0]));

        let channel = CommandChannel::new(Box::new(mock));
        let packet = channel
            .execute(commands::READ_BATTERY_LEVEL, &[])
            .await
            .unwrap();
        assert!(packet.is_ack());
        assert_eq!(packet.payload, vec![87, 0, 0, 0]);
    }

    #[tokio::test]
    async fn ping_true_on_ack() {
        let mut mock = MockTransport::new();
        let request = compose(commands::PING, &[]).unwrap();
        mock.expect(&request, &response(commands::ACK, &[]));

        let channel = CommandChannel::new(Box::new(mock));
        assert!(channel.ping().await.unwrap());
    }

    #[tokio::test]
    async fn ping_false_on_nak() {
        let mut mock = MockTransport::new();
        let request = compose(commands::PING, &[]).unwrap();
        mock.expect(&request, &response(commands::NAK, &[]));

        let channel = CommandChannel::new(Box::new(mock));
        assert!(!channel.ping().await.unwrap());
    }

    #[tokio::test]
    async fn bad_sof_in_response_is_framing_error() {
        let mut mock = MockTransport::new();
        let request = compose(commands::PING, &[]).unwrap();
        let mut bad = response(commands::ACK, &[]);
        bad[0] = 0x7E;
        mock.expect(&request, &bad);

        let channel = CommandChannel::new(Box::new(mock));
        let result = channel.execute(commands::PING, &[]).await;
        assert!(matches!(result, Err(Error::Framing(_))));
    }

    #[tokio::test]
    async fn corrupted_response_is_crc_error() {
        let mut mock = MockTransport::new();
        let request = compose(commands::PING, &[]).unwrap();
        let mut bad = response(commands::ACK, &[0x42]);
        bad[4] ^= 0x10; // flip a payload bit
        mock.expect(&request, &bad);

        let channel = CommandChannel::new(Box::new(mock));
        let result = channel.execute(commands::PING, &[]).await;
        assert!(matches!(result, Err(Error::Crc { .. })));
    }

    #[tokio::test]
    async fn missing_response_times_out() {
        let mut mock = MockTransport::new();
        let request = compose(commands::PING, &[]).unwrap();
        mock.expect(&request, &[]); // device stays silent

        let channel = CommandChannel::with_timeout(Box::new(mock), Duration::from_millis(10));
        let result = channel.execute(commands::PING, &[]).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn ensure_ack_names_the_response_code() {
        let packet = Packet {
            command: commands::INVALID_MODE,
            payload: vec![],
        };
        let err = packet.ensure_ack().unwrap_err();
        assert!(err.to_string().contains("INVALID_MODE"));
    }

    #[tokio::test]
    async fn concurrent_executes_never_interleave_writes() {
        // Two tasks race the same channel; the mock transport's write log
        // must show each request immediately followed by its own read, i.e.
        // the expectation queue is consumed strictly pairwise. A mismatched
        // (interleaved) send would fail the expectation check inside the
        // mock.
        let mut mock = MockTransport::new();
        let req_a = compose(commands::READ_BATTERY_LEVEL, &[]).unwrap();
        let req_b = compose(commands::READ_TRANSMITTER_ID, &[]).unwrap();
        // The serialized order is whichever task wins the lock; allow both.
        mock.expect_unordered(&[
            (req_a.clone(), response(commands::ACK, &[50, 0, 0, 0])),
            (req_b.clone(), response(commands::ACK, b"40M000")),
        ]);

        let channel = Arc::new(CommandChannel::new(Box::new(mock)));
        let a = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.execute(commands::READ_BATTERY_LEVEL, &[]).await })
        };
        let b = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.execute(commands::READ_TRANSMITTER_ID, &[]).await })
        };

        let pa = a.await.unwrap().unwrap();
        let pb = b.await.unwrap().unwrap();
        assert_eq!(pa.payload, vec![50, 0, 0, 0]);
        assert_eq!(pb.payload, b"40M000".to_vec());
    }
}
