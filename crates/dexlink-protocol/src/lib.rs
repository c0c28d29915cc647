//! dexlink-protocol: the Dexcom receiver link protocol.
//!
//! Implements the layers between an open byte transport and fully decoded
//! history records:
//!
//! - [`crc`] -- the CRC16 the receiver firmware computes
//! - [`frame`] -- packet composition and parsing (SOF, length, command,
//!   payload, CRC)
//! - [`commands`] -- the closed command-id and response-code vocabulary
//! - [`channel`] -- one mutex-serialized request/response exchange at a time
//! - [`pages`] -- page headers and page-span arithmetic for the on-device
//!   record store
//! - [`records`] -- pure revision-branching record decoding
//! - [`xml`] -- attribute extraction for the receiver's XML fragments
//! - [`session`] -- [`DeviceSession`]: generation resolution, typed queries,
//!   and bulk/lazy history reads
//!
//! Everything below [`session`] is pure or transport-generic, so the whole
//! stack runs against the `dexlink-test-harness` mock byte-for-byte as it
//! does against hardware.

pub mod channel;
pub mod commands;
pub mod crc;
pub mod frame;
pub mod pages;
pub mod records;
pub mod session;
pub mod xml;

pub use channel::CommandChannel;
pub use frame::{Chunk, Packet};
pub use pages::PageHeader;
pub use session::{DeviceSession, RecordPager};
