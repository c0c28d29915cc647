//! dexlink-test-harness: deterministic test doubles for dexlink.
//!
//! Provides [`MockTransport`], a scripted implementation of the
//! [`Transport`](dexlink_core::Transport) trait with an expectation queue, a
//! write log, and half-duplex interleave detection. Protocol tests across
//! the workspace drive full command/response exchanges against it without
//! hardware.

pub mod mock_serial;

pub use mock_serial::MockTransport;
