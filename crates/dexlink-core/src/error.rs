//! Error types for dexlink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. The variants are deliberately distinct
//! because callers treat them differently: a [`Error::Framing`] usually means
//! "this is not a Dexcom receiver", a [`Error::Crc`] usually means "noisy
//! cable, worth one retry", and a [`Error::ProtocolInvariant`] means a logic
//! bug or firmware mismatch that must never be papered over.

/// The error type for all dexlink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level failure (serial open, read, write).
    #[error("transport error: {0}")]
    Transport(String),

    /// No connection to the receiver has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the receiver was lost unexpectedly (cable pulled).
    #[error("connection lost")]
    ConnectionLost,

    /// Timed out waiting for bytes from the receiver.
    ///
    /// A normal, expected failure mode: the receiver is momentarily busy or
    /// the cable is disconnected. Retry policy belongs to the caller.
    #[error("timeout waiting for receiver")]
    Timeout,

    /// The byte stream does not look like the receiver link protocol
    /// (bad start-of-frame, impossible declared length).
    #[error("framing error: {0}")]
    Framing(String),

    /// A frame, page header, or record failed its CRC16 check.
    #[error("crc mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    Crc {
        /// CRC carried on the wire.
        expected: u16,
        /// CRC computed over the received bytes.
        computed: u16,
    },

    /// The receiver answered with something that violates the protocol
    /// contract (wrong page echoed back, error response code). Always fatal
    /// to the operation; never retried.
    #[error("protocol invariant violated: {0}")]
    ProtocolInvariant(String),

    /// A record or page could not be decoded (truncated buffer, unknown
    /// revision, out-of-range field).
    #[error("decode error: {0}")]
    Decode(String),

    /// The record family has no binary layout in this library.
    #[error("unsupported record type: {0}")]
    Unsupported(String),

    /// An invalid parameter was passed to a protocol operation
    /// (e.g. an oversized payload).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
