//! # dexlink -- Dexcom receiver link protocol for Rust
//!
//! `dexlink` reads Dexcom G4/G5/G6 glucose-monitor receivers over their
//! USB-serial link: framed binary packets with a firmware-matching CRC16, a
//! strictly synchronous command channel, the paged on-device record store,
//! and revision-aware decoding of every published record layout.
//!
//! ## Quick Start
//!
//! Add `dexlink` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! dexlink = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Locate a receiver and download its glucose history:
//!
//! ```no_run
//! use dexlink::{find_receiver_port, DeviceSession, RecordType, SerialTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let port = find_receiver_port()?.ok_or_else(|| anyhow::anyhow!("no receiver"))?;
//!     let transport = SerialTransport::open(&port).await?;
//!     let mut session = DeviceSession::new(Box::new(transport));
//!
//!     let identity = session.resolve().await?;
//!     println!("found {} receiver, firmware {}", identity.generation, identity.firmware_version);
//!
//!     let egvs = session.read_all_records(RecordType::EgvData).await?;
//!     println!("{} glucose readings on device", egvs.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                  | Purpose                                       |
//! |------------------------|-----------------------------------------------|
//! | `dexlink-core`         | [`Transport`] trait, record types, errors     |
//! | `dexlink-transport`    | Serial port implementation + USB discovery    |
//! | `dexlink-protocol`     | Framing, CRC16, command channel, page store, record decoding |
//! | `dexlink-test-harness` | Mock transport for deterministic tests        |
//! | **`dexlink`**          | This facade crate -- re-exports everything    |
//!
//! ## Concurrency model
//!
//! The receiver cannot multiplex: one command is in flight at a time, and
//! every exchange runs to completion before the next may start. The
//! [`CommandChannel`] enforces this with a mutex held across the whole
//! request/response pair, so a session may be shared between tasks and the
//! exchanges simply serialize. There is no background task and no
//! cancellation -- abandoning a long history download just means not asking
//! for the next page.
//!
//! ## Decoding model
//!
//! Record layouts vary across the G4/G5/G6 firmware families. The decoder
//! keys on the revision number carried in every page header -- never on the
//! firmware version string, which is only a coarse hint resolved once per
//! session into a [`DeviceIdentity`].

pub use dexlink_core::*;

/// Protocol layers: framing, CRC, command channel, page store, decoding.
pub mod protocol {
    pub use dexlink_protocol::*;
}

/// Physical transports and USB discovery.
pub mod transport {
    pub use dexlink_transport::*;
}

pub use dexlink_protocol::{CommandChannel, DeviceSession, PageHeader, RecordPager};
pub use dexlink_transport::{find_receiver_port, SerialTransport};
