//! dexlink-transport: physical-link implementations for dexlink.
//!
//! Provides [`SerialTransport`], the USB virtual COM port implementation of
//! the [`Transport`](dexlink_core::Transport) trait, and
//! [`find_receiver_port`], a thin USB vendor/product-id discovery helper.

pub mod discovery;
pub mod serial;

pub use discovery::find_receiver_port;
pub use serial::{SerialConfig, SerialTransport, OPEN_SETTLE_DELAY, RECEIVER_BAUD};
