//! Receiver link frame encoder/decoder.
//!
//! Every exchange with the receiver is one framed packet each way:
//!
//! ```text
//! offset 0      : SOF = 0x01
//! offset 1..3   : total_length (u16 LE) -- includes header and trailing CRC
//! offset 3      : command (u8)
//! offset 4..N-2 : payload (0..=1584 bytes)
//! offset N-2..N : crc16 (u16 LE) -- over bytes [0, N-2)
//! ```
//!
//! This module is pure byte work: composing a frame from a command id and
//! payload pieces, and validating/parsing a received frame. The I/O pacing
//! (read header, then payload, then CRC) lives in the command channel.

use bytes::{BufMut, BytesMut};

use dexlink_core::{Error, Result};

use crate::crc::crc16;

/// Start-of-frame marker beginning every packet.
pub const SOF: u8 = 0x01;

/// Frame overhead: SOF + length + command + CRC.
pub const MIN_FRAME_LEN: usize = 6;

/// Largest payload the receiver accepts in one frame.
pub const MAX_PAYLOAD: usize = 1584;

/// Largest total frame length ([`MIN_FRAME_LEN`] + [`MAX_PAYLOAD`]).
pub const MAX_FRAME_LEN: usize = MIN_FRAME_LEN + MAX_PAYLOAD;

/// A parsed link packet: the command byte and its payload.
///
/// Transient -- exists only for the duration of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Command byte. In a response this is one of the receiver's response
    /// codes (ACK, NAK, ...).
    pub command: u8,
    /// Payload bytes (may be empty).
    pub payload: Vec<u8>,
}

impl Packet {
    /// Returns `true` if this packet carries the ACK response code.
    pub fn is_ack(&self) -> bool {
        self.command == crate::commands::ACK
    }

    /// Returns `true` if this packet carries the NAK response code.
    pub fn is_nak(&self) -> bool {
        self.command == crate::commands::NAK
    }

    /// Require the ACK response code, mapping anything else to a
    /// [`Error::ProtocolInvariant`] naming the code the receiver sent.
    pub fn ensure_ack(&self) -> Result<()> {
        if self.is_ack() {
            Ok(())
        } else {
            Err(Error::ProtocolInvariant(format!(
                "receiver answered {} ({:#04x}) instead of ACK",
                crate::commands::response_name(self.command),
                self.command
            )))
        }
    }
}

/// One piece of a command payload.
///
/// The receiver's commands mix raw bytes, ASCII text, and 4-byte
/// little-endian integers; a payload is an ordered list of these pieces.
#[derive(Debug, Clone, Copy)]
pub enum Chunk<'a> {
    /// Raw bytes, appended verbatim.
    Bytes(&'a [u8]),
    /// UTF-8 text, appended as its bytes.
    Str(&'a str),
    /// A 4-byte little-endian unsigned integer.
    U32(u32),
}

impl<'a> Chunk<'a> {
    fn len(&self) -> usize {
        match self {
            Chunk::Bytes(b) => b.len(),
            Chunk::Str(s) => s.len(),
            Chunk::U32(_) => 4,
        }
    }
}

/// Compose a command frame ready for transmission.
///
/// The declared length covers the whole frame including the trailing CRC;
/// the CRC covers everything before itself. A payload larger than
/// [`MAX_PAYLOAD`] is an error, never a truncation.
///
/// # Example
///
/// ```
/// use dexlink_protocol::frame::{compose, Chunk};
///
/// // PING carries no payload.
/// let bytes = compose(10, &[]).unwrap();
/// assert_eq!(bytes, vec![0x01, 0x06, 0x00, 0x0A, 0x5E, 0x65]);
/// ```
pub fn compose(command: u8, payload: &[Chunk<'_>]) -> Result<Vec<u8>> {
    let payload_len: usize = payload.iter().map(Chunk::len).sum();
    if payload_len > MAX_PAYLOAD {
        return Err(Error::InvalidParameter(format!(
            "payload of {payload_len} bytes exceeds the {MAX_PAYLOAD}-byte frame limit"
        )));
    }

    let total_len = MIN_FRAME_LEN + payload_len;
    let mut buf = BytesMut::with_capacity(total_len);
    buf.put_u8(SOF);
    buf.put_u16_le(total_len as u16);
    buf.put_u8(command);
    for chunk in payload {
        match chunk {
            Chunk::Bytes(b) => buf.put_slice(b),
            Chunk::Str(s) => buf.put_slice(s.as_bytes()),
            Chunk::U32(n) => buf.put_u32_le(*n),
        }
    }
    let crc = crc16(&buf);
    buf.put_u16_le(crc);
    Ok(buf.to_vec())
}

/// The validated 4-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Declared total frame length, header and CRC included.
    pub total_length: usize,
    /// Command byte.
    pub command: u8,
}

/// Validate the leading 4 bytes of a frame.
///
/// Checks the SOF marker and that the declared length is physically
/// possible. Both failures are [`Error::Framing`]: a stream that fails here
/// is not speaking the receiver protocol at all.
pub fn parse_header(header: &[u8; 4]) -> Result<FrameHeader> {
    if header[0] != SOF {
        return Err(Error::Framing(format!(
            "bad start-of-frame byte {:#04x}",
            header[0]
        )));
    }
    let total_length = u16::from_le_bytes([header[1], header[2]]) as usize;
    if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&total_length) {
        return Err(Error::Framing(format!(
            "declared frame length {total_length} outside {MIN_FRAME_LEN}..={MAX_FRAME_LEN}"
        )));
    }
    Ok(FrameHeader {
        total_length,
        command: header[3],
    })
}

/// Verify a complete frame's trailing CRC and extract the payload.
///
/// `frame` must be exactly `header.total_length` bytes. A CRC mismatch is
/// [`Error::Crc`], deliberately distinct from [`Error::Framing`]: framing
/// failures mean "wrong device", CRC failures mean "noisy line".
pub fn check_frame(header: FrameHeader, frame: &[u8]) -> Result<Packet> {
    if frame.len() != header.total_length {
        return Err(Error::Framing(format!(
            "declared length {} does not match actual frame length {}",
            header.total_length,
            frame.len()
        )));
    }
    let crc_offset = header.total_length - 2;
    let expected = u16::from_le_bytes([frame[crc_offset], frame[crc_offset + 1]]);
    let computed = crc16(&frame[..crc_offset]);
    if expected != computed {
        return Err(Error::Crc { expected, computed });
    }
    Ok(Packet {
        command: header.command,
        payload: frame[4..crc_offset].to_vec(),
    })
}

/// Parse a complete frame held in one buffer.
///
/// The declared length must equal the buffer's actual length -- a frame that
/// lies about its length is rejected as [`Error::Framing`] before the CRC is
/// even considered, so a CRC that happens to cover the actual bytes cannot
/// launder a malformed frame.
pub fn parse(buf: &[u8]) -> Result<Packet> {
    if buf.len() < MIN_FRAME_LEN {
        return Err(Error::Framing(format!(
            "frame of {} bytes is shorter than the {MIN_FRAME_LEN}-byte minimum",
            buf.len()
        )));
    }
    let header = parse_header(&[buf[0], buf[1], buf[2], buf[3]])?;
    check_frame(header, buf)
}
