//! dexlink-core: Core traits, types, and error definitions for dexlink.
//!
//! This crate defines the transport-agnostic abstractions the protocol and
//! transport crates implement. Applications that only consume decoded
//! records can depend on these types without pulling in the serial stack.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel to a receiver
//! - [`RecordType`] / [`Record`] -- the on-device database vocabulary and
//!   its decoded values
//! - [`Generation`] / [`DeviceIdentity`] -- hardware family classification
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod records;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use dexlink_core::*`.
pub use error::{Error, Result};
pub use records::Record;
pub use transport::Transport;
pub use types::*;
