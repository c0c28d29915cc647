//! Page headers and page-span arithmetic for the on-device record store.
//!
//! The receiver's database is a set of append-only partitions, one per
//! [`RecordType`], each divided into fixed-capacity pages. A page read
//! returns a 28-byte header followed by the raw record bytes; the header
//! carries its own CRC16 and echoes back the record type and page number it
//! belongs to. Both are validated here before anything downstream trusts
//! the payload.

use dexlink_core::{Error, RecordType, Result};

use crate::crc::crc16;

/// Size of the page header on the wire, its own CRC included.
pub const PAGE_HEADER_LEN: usize = 28;

/// Header of one database page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    /// Index of the first record in this page within the whole partition.
    pub first_index: u32,
    /// Number of records stored in this page.
    pub record_count: u32,
    /// Record type this page belongs to.
    pub record_type: RecordType,
    /// Binary layout revision for the records in this page.
    ///
    /// This is ground truth for decoding -- it outranks the firmware-version
    /// generation hint whenever the two disagree.
    pub revision: u8,
    /// This page's number within the partition.
    pub page_number: u32,
    /// Reserved field, kept for visibility in captures.
    pub reserved1: u32,
    /// Reserved field.
    pub reserved2: u32,
    /// Reserved field.
    pub reserved3: u32,
}

impl PageHeader {
    /// Parse and validate a page header from the start of a page payload.
    ///
    /// The header's trailing CRC16 must validate independently of the frame
    /// CRC before any field is trusted.
    pub fn parse(data: &[u8]) -> Result<PageHeader> {
        if data.len() < PAGE_HEADER_LEN {
            return Err(Error::Decode(format!(
                "page payload of {} bytes cannot hold the {PAGE_HEADER_LEN}-byte header",
                data.len()
            )));
        }
        let expected = u16::from_le_bytes([data[26], data[27]]);
        let computed = crc16(&data[..26]);
        if expected != computed {
            return Err(Error::Crc { expected, computed });
        }
        Ok(PageHeader {
            first_index: u32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            record_count: u32::from_le_bytes([data[4], data[5], data[6], data[7]]),
            record_type: RecordType::from_wire_index(data[8])?,
            revision: data[9],
            page_number: u32::from_le_bytes([data[10], data[11], data[12], data[13]]),
            reserved1: u32::from_le_bytes([data[14], data[15], data[16], data[17]]),
            reserved2: u32::from_le_bytes([data[18], data[19], data[20], data[21]]),
            reserved3: u32::from_le_bytes([data[22], data[23], data[24], data[25]]),
        })
    }

    /// Assert that this header answers the page we actually asked for.
    ///
    /// A mismatch means the receiver and this library disagree about the
    /// exchange in flight -- a logic bug or firmware mismatch, fatal to the
    /// read and never retried.
    pub fn ensure_matches(&self, record_type: RecordType, page_number: u32) -> Result<()> {
        if self.record_type != record_type {
            return Err(Error::ProtocolInvariant(format!(
                "requested {record_type} but page header claims {}",
                self.record_type
            )));
        }
        if self.page_number != page_number {
            return Err(Error::ProtocolInvariant(format!(
                "requested page {page_number} but page header claims {}",
                self.page_number
            )));
        }
        Ok(())
    }
}

/// Expand a `(start, end)` page-range response into the pages to read,
/// ascending.
///
/// The device convention, preserved from field-verified behavior:
/// `(0, 0)` means the partition has never been written -- nothing to read.
/// `start == end` (non-zero) is a single-page range. Otherwise the range is
/// inclusive on both ends.
pub fn page_span(start: u32, end: u32) -> Vec<u32> {
    if start == 0 && end == 0 {
        Vec::new()
    } else {
        (start..=end).collect()
    }
}
