//! Mock transport for deterministic testing of the protocol layers.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test frame composition, the command
//! channel, page reads, and record decoding without real hardware.
//!
//! # Example
//!
//! ```
//! use dexlink_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // Pre-load: when this request frame is written, queue this response.
//! mock.expect(&[0x01, 0x06, 0x00, 0x0A, 0x5E, 0x65],
//!             &[0x01, 0x06, 0x00, 0x01, 0x35, 0xD4]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use dexlink_core::error::{Error, Result};
use dexlink_core::transport::Transport;

/// A pre-loaded request/response pair.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact frame we expect to be written.
    request: Vec<u8>,
    /// The bytes to serve to subsequent `read` calls.
    response: Vec<u8>,
}

/// A mock [`Transport`] for testing protocol layers without hardware.
///
/// Ordered expectations (from [`expect`](MockTransport::expect)) are consumed
/// front-to-back; unordered expectations (from
/// [`expect_unordered`](MockTransport::expect_unordered)) are matched by
/// content, which concurrency tests need because lock acquisition order is
/// not deterministic.
///
/// A `write` that arrives while the previous response still has unread bytes
/// is reported as an error -- on the real half-duplex link that is exactly an
/// interleaved exchange, which the command channel's lock must prevent.
#[derive(Debug, Default)]
pub struct MockTransport {
    ordered: VecDeque<Expectation>,
    unordered: Vec<Expectation>,
    /// Bytes queued for `read`, plus a cursor into them.
    pending_response: Vec<u8>,
    response_cursor: usize,
    connected: bool,
    /// Log of every frame written, in arrival order.
    write_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            connected: true,
            ..Default::default()
        }
    }

    /// Add an expected request/response pair, matched in order.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.ordered.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Add request/response pairs matched by content rather than order.
    ///
    /// Use for tests where several tasks race the command channel and the
    /// serialization order is legitimately nondeterministic.
    pub fn expect_unordered(&mut self, pairs: &[(Vec<u8>, Vec<u8>)]) {
        for (request, response) in pairs {
            self.unordered.push(Expectation {
                request: request.clone(),
                response: response.clone(),
            });
        }
    }

    /// Every frame written so far, in arrival order.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.write_log
    }

    /// Number of expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.ordered.len() + self.unordered.len()
    }

    /// Force the connected state (simulates a pulled cable).
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn unread_response_bytes(&self) -> usize {
        self.pending_response.len() - self.response_cursor
    }

    fn take_expectation(&mut self, data: &[u8]) -> Result<Expectation> {
        if let Some(front) = self.ordered.pop_front() {
            if front.request.as_slice() == data {
                return Ok(front);
            }
            let err = Error::Transport(format!(
                "unexpected write: expected {:02X?}, got {:02X?}",
                front.request, data
            ));
            self.ordered.push_front(front);
            return Err(err);
        }
        if let Some(pos) = self
            .unordered
            .iter()
            .position(|e| e.request.as_slice() == data)
        {
            return Ok(self.unordered.swap_remove(pos));
        }
        Err(Error::Transport(format!(
            "no expectation matches write {data:02X?}"
        )))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn read(&mut self, n: usize, _timeout: Duration) -> Result<Vec<u8>> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        // The device only "answers" a written command; fewer bytes than
        // requested means the caller would block until the deadline.
        if self.unread_response_bytes() < n {
            return Err(Error::Timeout);
        }
        let start = self.response_cursor;
        self.response_cursor += n;
        Ok(self.pending_response[start..self.response_cursor].to_vec())
    }

    async fn write(&mut self, data: &[u8]) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.unread_response_bytes() > 0 {
            return Err(Error::Transport(format!(
                "write of {:02X?} while {} response bytes are still unread (interleaved exchange)",
                data,
                self.unread_response_bytes()
            )));
        }
        self.write_log.push(data.to_vec());
        let expectation = self.take_expectation(data)?;
        self.pending_response = expectation.response;
        self.response_cursor = 0;
        Ok(data.len())
    }

    async fn clear_buffers(&mut self) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.pending_response.clear();
        self.response_cursor = 0;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending_response.clear();
        self.response_cursor = 0;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn basic_write_then_read() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01, 0x02], &[0xAA, 0xBB, 0xCC]);

        mock.write(&[0x01, 0x02]).await.unwrap();
        let first = mock.read(2, TIMEOUT).await.unwrap();
        assert_eq!(first, vec![0xAA, 0xBB]);
        let rest = mock.read(1, TIMEOUT).await.unwrap();
        assert_eq!(rest, vec![0xCC]);
    }

    #[tokio::test]
    async fn short_read_times_out() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xAA]);
        mock.write(&[0x01]).await.unwrap();

        let result = mock.read(2, TIMEOUT).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn read_without_write_times_out() {
        let mut mock = MockTransport::new();
        let result = mock.read(1, TIMEOUT).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn wrong_write_is_rejected() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xAA]);
        let result = mock.write(&[0x99]).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn exhausted_expectations_reject_writes() {
        let mut mock = MockTransport::new();
        let result = mock.write(&[0x01]).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn interleaved_write_is_detected() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xAA, 0xBB]);
        mock.expect(&[0x02], &[0xCC]);

        mock.write(&[0x01]).await.unwrap();
        // Second command before the first response is drained: the
        // half-duplex violation the channel lock exists to prevent.
        let result = mock.write(&[0x02]).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn unordered_expectations_match_by_content() {
        let mut mock = MockTransport::new();
        mock.expect_unordered(&[
            (vec![0x01], vec![0xAA]),
            (vec![0x02], vec![0xBB]),
        ]);

        mock.write(&[0x02]).await.unwrap();
        assert_eq!(mock.read(1, TIMEOUT).await.unwrap(), vec![0xBB]);
        mock.write(&[0x01]).await.unwrap();
        assert_eq!(mock.read(1, TIMEOUT).await.unwrap(), vec![0xAA]);
        assert_eq!(mock.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn clear_buffers_discards_pending_response() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xAA, 0xBB]);
        mock.expect(&[0x02], &[0xCC]);

        mock.write(&[0x01]).await.unwrap();
        mock.clear_buffers().await.unwrap();
        // The stale response is gone; the next exchange proceeds cleanly.
        mock.write(&[0x02]).await.unwrap();
        assert_eq!(mock.read(1, TIMEOUT).await.unwrap(), vec![0xCC]);
    }

    #[tokio::test]
    async fn write_log_records_order() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[]);
        mock.expect(&[0x02], &[]);

        mock.write(&[0x01]).await.unwrap();
        mock.write(&[0x02]).await.unwrap();
        assert_eq!(mock.writes(), &[vec![0x01], vec![0x02]]);
    }

    #[tokio::test]
    async fn close_disconnects() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());
        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.write(&[0x01]).await;
        assert!(matches!(result, Err(Error::NotConnected)));
        let result = mock.read(1, TIMEOUT).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
