//! Device session: generation resolution, typed queries, and history reads.
//!
//! [`DeviceSession`] is the top of the protocol stack. It owns the
//! [`CommandChannel`] for one physical receiver and caches the
//! [`DeviceIdentity`] resolved from the firmware header, replacing the
//! ambient current-device state a long-running host application would
//! otherwise accumulate. Everything it returns is plain data; persistence
//! and presentation belong to the caller.

use tracing::{debug, info, warn};

use dexlink_core::{
    BatteryState, ClockMode, DeviceIdentity, Error, Generation, GlucoseUnit, Record, RecordType,
    Result, Transport, XmlFragment,
};

use crate::channel::CommandChannel;
use crate::commands;
use crate::frame::{Chunk, Packet};
use crate::pages::{page_span, PageHeader, PAGE_HEADER_LEN};
use crate::records;
use crate::xml;

/// A session with one attached receiver.
pub struct DeviceSession {
    channel: CommandChannel,
    identity: Option<DeviceIdentity>,
}

impl DeviceSession {
    /// Build a session over an open transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        DeviceSession {
            channel: CommandChannel::new(transport),
            identity: None,
        }
    }

    /// Build a session over an existing command channel.
    pub fn with_channel(channel: CommandChannel) -> Self {
        DeviceSession {
            channel,
            identity: None,
        }
    }

    /// The underlying command channel, for callers issuing raw commands.
    pub fn channel(&self) -> &CommandChannel {
        &self.channel
    }

    /// Liveness check.
    pub async fn ping(&self) -> Result<bool> {
        self.channel.ping().await
    }

    /// Close the session's transport.
    pub async fn close(&self) -> Result<()> {
        self.channel.close().await
    }

    // -----------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------

    /// Resolve and cache the attached receiver's identity.
    ///
    /// Reads the firmware header once and classifies the unit from its
    /// `FirmwareVersion` attribute. The classification is a coarse default
    /// only -- per-page revisions remain ground truth for record layouts.
    /// The serial number is taken from manufacturing data when that
    /// partition is readable; its absence is logged, not fatal.
    pub async fn resolve(&mut self) -> Result<DeviceIdentity> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }

        let header = self.firmware_header().await?;
        let version = xml::attribute(header.as_str(), "FirmwareVersion")
            .ok_or_else(|| {
                Error::Decode("firmware header carries no FirmwareVersion attribute".into())
            })?
            .to_string();
        let generation = Generation::classify(&version);
        if let Generation::Unknown(v) = &generation {
            warn!(version = %v, "unrecognized firmware version string");
        }

        let serial_number = match self.manufacturing_data().await {
            Ok(Some(fragment)) => {
                xml::attribute(fragment.as_str(), "SerialNumber").map(str::to_string)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "manufacturing data unavailable, serial number unknown");
                None
            }
        };

        let identity = DeviceIdentity {
            generation,
            serial_number,
            firmware_header: header,
            firmware_version: version,
        };
        info!(
            generation = %identity.generation,
            serial = identity.serial_number.as_deref().unwrap_or("?"),
            "receiver identified"
        );
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    // -----------------------------------------------------------------
    // Single-value queries
    // -----------------------------------------------------------------

    /// Read the firmware header document.
    pub async fn firmware_header(&self) -> Result<XmlFragment> {
        let packet = self.query(commands::READ_FIRMWARE_HEADER).await?;
        payload_xml(&packet)
    }

    /// Read the database partition table document.
    pub async fn partition_info(&self) -> Result<XmlFragment> {
        let packet = self.query(commands::READ_DATABASE_PARTITION_INFO).await?;
        payload_xml(&packet)
    }

    /// Read the manufacturing-data document from the record store.
    ///
    /// Returns `None` when the partition is empty.
    pub async fn manufacturing_data(&self) -> Result<Option<XmlFragment>> {
        let records = self
            .read_all_records(RecordType::ManufacturingData)
            .await?;
        Ok(records.into_iter().find_map(|record| match record {
            Record::Xml(r) => Some(r.fragment),
            _ => None,
        }))
    }

    /// Read the paired transmitter id.
    pub async fn transmitter_id(&self) -> Result<String> {
        let packet = self.query(commands::READ_TRANSMITTER_ID).await?;
        Ok(ascii_payload(&packet.payload))
    }

    /// Read the battery charge percentage.
    pub async fn battery_level(&self) -> Result<u32> {
        let packet = self.query(commands::READ_BATTERY_LEVEL).await?;
        payload_u32(&packet)
    }

    /// Read the battery charging state.
    pub async fn battery_state(&self) -> Result<BatteryState> {
        let packet = self.query(commands::READ_BATTERY_STATE).await?;
        BatteryState::from_raw(payload_u8(&packet)?)
    }

    /// Read the configured glucose display unit.
    pub async fn glucose_unit(&self) -> Result<GlucoseUnit> {
        let packet = self.query(commands::READ_GLUCOSE_UNIT).await?;
        GlucoseUnit::from_raw(payload_u8(&packet)?)
    }

    /// Read the configured 12/24-hour clock mode.
    pub async fn clock_mode(&self) -> Result<ClockMode> {
        let packet = self.query(commands::READ_CLOCK_MODE).await?;
        ClockMode::from_raw(payload_u8(&packet)?)
    }

    /// Read the configured language code (1033 = English).
    pub async fn language(&self) -> Result<u16> {
        let packet = self.query(commands::READ_LANGUAGE).await?;
        payload_u16(&packet)
    }

    /// Read the system clock, receiver epoch seconds.
    pub async fn system_seconds(&self) -> Result<u32> {
        let packet = self.query(commands::READ_SYSTEM_TIME).await?;
        payload_u32(&packet)
    }

    /// Read the real-time clock, receiver epoch seconds.
    pub async fn rtc_seconds(&self) -> Result<u32> {
        let packet = self.query(commands::READ_RTC).await?;
        payload_u32(&packet)
    }

    /// Read the display-time offset, signed seconds.
    pub async fn display_time_offset(&self) -> Result<i32> {
        let packet = self.query(commands::READ_DISPLAY_TIME_OFFSET).await?;
        payload_i32(&packet)
    }

    /// Read the system-time offset, signed seconds.
    pub async fn system_time_offset(&self) -> Result<i32> {
        let packet = self.query(commands::READ_SYSTEM_TIME_OFFSET).await?;
        payload_i32(&packet)
    }

    async fn query(&self, command: u8) -> Result<Packet> {
        let packet = self.channel.execute(command, &[]).await?;
        packet.ensure_ack()?;
        Ok(packet)
    }

    // -----------------------------------------------------------------
    // Paged record store
    // -----------------------------------------------------------------

    /// Read the `(start, end)` page numbers holding `record_type`.
    pub async fn page_range(&self, record_type: RecordType) -> Result<(u32, u32)> {
        let packet = self
            .channel
            .execute(
                commands::READ_DATABASE_PAGE_RANGE,
                &[Chunk::Bytes(&[record_type.wire_index()])],
            )
            .await?;
        packet.ensure_ack()?;
        if packet.payload.len() != 8 {
            return Err(Error::Decode(format!(
                "page range response holds {} bytes, expected 8",
                packet.payload.len()
            )));
        }
        let p = &packet.payload;
        let start = u32::from_le_bytes([p[0], p[1], p[2], p[3]]);
        let end = u32::from_le_bytes([p[4], p[5], p[6], p[7]]);
        debug!(%record_type, start, end, "page range");
        Ok((start, end))
    }

    /// Read one database page: validated header plus raw record bytes.
    ///
    /// Returns `None` for an empty page response, which ends iteration for
    /// the partition. A CRC failure on the exchange is retried exactly once
    /// (visible as a warning) -- the line is noisy, the command idempotent.
    pub async fn read_page(
        &self,
        record_type: RecordType,
        page_number: u32,
    ) -> Result<Option<(PageHeader, Vec<u8>)>> {
        match self.read_page_once(record_type, page_number).await {
            Err(Error::Crc { expected, computed }) => {
                warn!(
                    %record_type,
                    page_number,
                    expected,
                    computed,
                    "page read failed CRC, retrying once"
                );
                self.read_page_once(record_type, page_number).await
            }
            other => other,
        }
    }

    async fn read_page_once(
        &self,
        record_type: RecordType,
        page_number: u32,
    ) -> Result<Option<(PageHeader, Vec<u8>)>> {
        let type_byte = [record_type.wire_index()];
        let request = [
            Chunk::Bytes(&type_byte),
            Chunk::U32(page_number),
            Chunk::Bytes(&[1]), // page count
        ];
        let packet = self
            .channel
            .execute(commands::READ_DATABASE_PAGES, &request)
            .await?;
        packet.ensure_ack()?;
        if packet.payload.is_empty() {
            debug!(%record_type, page_number, "empty page response");
            return Ok(None);
        }
        let header = PageHeader::parse(&packet.payload)?;
        header.ensure_matches(record_type, page_number)?;
        Ok(Some((header, packet.payload[PAGE_HEADER_LEN..].to_vec())))
    }

    /// Download and decode every record of `record_type`, oldest first.
    ///
    /// The primary bulk-synchronization path. An empty page response stops
    /// iteration leniently and returns what has been read so far.
    pub async fn read_all_records(&self, record_type: RecordType) -> Result<Vec<Record>> {
        let (start, end) = self.page_range(record_type).await?;
        let mut out = Vec::new();
        for page_number in page_span(start, end) {
            match self.read_page(record_type, page_number).await? {
                Some((header, data)) => {
                    out.extend(records::decode_page(&header, &data)?);
                }
                None => break,
            }
        }
        debug!(%record_type, records = out.len(), "record download complete");
        Ok(out)
    }

    /// Consumer-paced reverse reader: newest page first, newest record first.
    ///
    /// For live "latest value" polling without downloading the whole
    /// history. Reuses the same per-page decode path as
    /// [`read_all_records`](Self::read_all_records).
    pub async fn records_newest_first(
        &self,
        record_type: RecordType,
    ) -> Result<RecordPager<'_>> {
        let (start, end) = self.page_range(record_type).await?;
        Ok(RecordPager {
            session: self,
            record_type,
            pages: page_span(start, end),
        })
    }
}

/// Lazy reverse pager over one record type, created by
/// [`DeviceSession::records_newest_first`].
pub struct RecordPager<'a> {
    session: &'a DeviceSession,
    record_type: RecordType,
    /// Remaining pages, ascending; consumed from the back.
    pages: Vec<u32>,
}

impl RecordPager<'_> {
    /// Fetch and decode the next page, newest first.
    ///
    /// Records within the page are returned newest first as well. Returns
    /// `Ok(None)` when the history is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        let Some(page_number) = self.pages.pop() else {
            return Ok(None);
        };
        match self.session.read_page(self.record_type, page_number).await? {
            Some((header, data)) => {
                let mut records = records::decode_page(&header, &data)?;
                records.reverse();
                Ok(Some(records))
            }
            None => {
                self.pages.clear();
                Ok(None)
            }
        }
    }

    /// Pages not yet fetched.
    pub fn remaining_pages(&self) -> usize {
        self.pages.len()
    }
}

fn payload_u8(packet: &Packet) -> Result<u8> {
    match packet.payload.as_slice() {
        [value, ..] => Ok(*value),
        [] => Err(Error::Decode("empty payload, expected at least 1 byte".into())),
    }
}

fn payload_u16(packet: &Packet) -> Result<u16> {
    let p: &[u8] = &packet.payload;
    match p {
        [a, b] => Ok(u16::from_le_bytes([*a, *b])),
        _ => Err(Error::Decode(format!(
            "payload holds {} bytes, expected 2",
            p.len()
        ))),
    }
}

fn payload_u32(packet: &Packet) -> Result<u32> {
    let p: &[u8] = &packet.payload;
    match p {
        [a, b, c, d] => Ok(u32::from_le_bytes([*a, *b, *c, *d])),
        _ => Err(Error::Decode(format!(
            "payload holds {} bytes, expected 4",
            p.len()
        ))),
    }
}

fn payload_i32(packet: &Packet) -> Result<i32> {
    payload_u32(packet).map(|v| v as i32)
}

fn payload_xml(packet: &Packet) -> Result<XmlFragment> {
    let end = packet
        .payload
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(packet.payload.len());
    let text = std::str::from_utf8(&packet.payload[..end])
        .map_err(|e| Error::Decode(format!("XML payload is not valid UTF-8: {e}")))?;
    Ok(XmlFragment(text.to_string()))
}

/// ASCII payload, NUL-padded on the wire.
fn ascii_payload(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;
    use crate::frame::compose;
    use dexlink_core::GlucoseReading;
    use dexlink_test_harness::MockTransport;

    // -----------------------------------------------------------------
    // Wire builders
    // -----------------------------------------------------------------

    fn request(command: u8, payload: &[Chunk<'_>]) -> Vec<u8> {
        compose(command, payload).unwrap()
    }

    fn ack(payload: &[u8]) -> Vec<u8> {
        compose(commands::ACK, &[Chunk::Bytes(payload)]).unwrap()
    }

    fn egv_record(glucose: u16, trend: u8) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&100_000u32.to_le_bytes());
        body.extend_from_slice(&100_500u32.to_le_bytes());
        body.extend_from_slice(&glucose.to_le_bytes());
        body.push(trend);
        let crc = crc16(&body);
        body.extend_from_slice(&crc.to_le_bytes());
        body
    }

    fn page_payload(record_type: RecordType, revision: u8, page: u32, records: &[Vec<u8>]) -> Vec<u8> {
        let mut header = Vec::new();
        header.extend_from_slice(&0u32.to_le_bytes());
        header.extend_from_slice(&(records.len() as u32).to_le_bytes());
        header.push(record_type.wire_index());
        header.push(revision);
        header.extend_from_slice(&page.to_le_bytes());
        header.extend_from_slice(&[0u8; 12]);
        let crc = crc16(&header);
        header.extend_from_slice(&crc.to_le_bytes());
        for record in records {
            header.extend_from_slice(record);
        }
        header
    }

    fn page_request(record_type: RecordType, page: u32) -> Vec<u8> {
        request(
            commands::READ_DATABASE_PAGES,
            &[
                Chunk::Bytes(&[record_type.wire_index()]),
                Chunk::U32(page),
                Chunk::Bytes(&[1]),
            ],
        )
    }

    fn range_request(record_type: RecordType) -> Vec<u8> {
        request(
            commands::READ_DATABASE_PAGE_RANGE,
            &[Chunk::Bytes(&[record_type.wire_index()])],
        )
    }

    fn range_response(start: u32, end: u32) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&start.to_le_bytes());
        payload.extend_from_slice(&end.to_le_bytes());
        ack(&payload)
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn battery_level_query() {
        let mut mock = MockTransport::new();
        mock.expect(
            &request(commands::READ_BATTERY_LEVEL, &[]),
            &ack(&87u32.to_le_bytes()),
        );
        let session = DeviceSession::new(Box::new(mock));
        assert_eq!(session.battery_level().await.unwrap(), 87);
    }

    #[tokio::test]
    async fn battery_state_query() {
        let mut mock = MockTransport::new();
        mock.expect(&request(commands::READ_BATTERY_STATE, &[]), &ack(&[2]));
        let session = DeviceSession::new(Box::new(mock));
        assert_eq!(
            session.battery_state().await.unwrap(),
            BatteryState::NotCharging
        );
    }

    #[tokio::test]
    async fn transmitter_id_query_trims_padding() {
        let mut mock = MockTransport::new();
        mock.expect(
            &request(commands::READ_TRANSMITTER_ID, &[]),
            &ack(b"40M000\0\0"),
        );
        let session = DeviceSession::new(Box::new(mock));
        assert_eq!(session.transmitter_id().await.unwrap(), "40M000");
    }

    #[tokio::test]
    async fn glucose_unit_query() {
        let mut mock = MockTransport::new();
        mock.expect(&request(commands::READ_GLUCOSE_UNIT, &[]), &ack(&[1]));
        let session = DeviceSession::new(Box::new(mock));
        assert_eq!(session.glucose_unit().await.unwrap(), GlucoseUnit::MgDl);
    }

    #[tokio::test]
    async fn display_time_offset_is_signed() {
        let mut mock = MockTransport::new();
        mock.expect(
            &request(commands::READ_DISPLAY_TIME_OFFSET, &[]),
            &ack(&(-3600i32).to_le_bytes()),
        );
        let session = DeviceSession::new(Box::new(mock));
        assert_eq!(session.display_time_offset().await.unwrap(), -3600);
    }

    #[tokio::test]
    async fn nak_on_query_is_protocol_invariant() {
        let mut mock = MockTransport::new();
        mock.expect(
            &request(commands::READ_BATTERY_LEVEL, &[]),
            &compose(commands::NAK, &[]).unwrap(),
        );
        let session = DeviceSession::new(Box::new(mock));
        let err = session.battery_level().await.unwrap_err();
        assert!(matches!(err, Error::ProtocolInvariant(_)));
        assert!(err.to_string().contains("NAK"));
    }

    #[tokio::test]
    async fn short_numeric_payload_is_decode_error() {
        let mut mock = MockTransport::new();
        mock.expect(&request(commands::READ_BATTERY_LEVEL, &[]), &ack(&[87, 0]));
        let session = DeviceSession::new(Box::new(mock));
        assert!(matches!(
            session.battery_level().await,
            Err(Error::Decode(_))
        ));
    }

    // -----------------------------------------------------------------
    // Identity resolution
    // -----------------------------------------------------------------

    const G4_HEADER: &[u8] = b"<FirmwareHeader SchemaVersion='1' ProductId='G4Receiver' \
        ProductName='Dexcom G4 Receiver' FirmwareVersion='4.2.1.012'/>";

    fn manufacturing_page(page: u32) -> Vec<u8> {
        let doc = b"<ManufacturingParameters SerialNumber='SM41234567' HardwareId='13'/>\0\0";
        page_payload(RecordType::ManufacturingData, 1, page, &[doc.to_vec()])
    }

    #[tokio::test]
    async fn resolve_classifies_and_caches() {
        let mut mock = MockTransport::new();
        mock.expect(&request(commands::READ_FIRMWARE_HEADER, &[]), &ack(G4_HEADER));
        mock.expect(
            &range_request(RecordType::ManufacturingData),
            &range_response(1, 1),
        );
        mock.expect(
            &page_request(RecordType::ManufacturingData, 1),
            &ack(&manufacturing_page(1)),
        );

        let mut session = DeviceSession::new(Box::new(mock));
        let identity = session.resolve().await.unwrap();
        assert_eq!(identity.generation, Generation::G4);
        assert_eq!(identity.firmware_version, "4.2.1.012");
        assert_eq!(identity.serial_number.as_deref(), Some("SM41234567"));

        // Cached: no further exchanges are scripted, yet resolve succeeds.
        let again = session.resolve().await.unwrap();
        assert_eq!(again.generation, Generation::G4);
    }

    #[tokio::test]
    async fn resolve_unknown_version_is_preserved() {
        let mut mock = MockTransport::new();
        mock.expect(
            &request(commands::READ_FIRMWARE_HEADER, &[]),
            &ack(b"<FirmwareHeader FirmwareVersion='9.9.9'/>"),
        );
        mock.expect(
            &range_request(RecordType::ManufacturingData),
            &range_response(0, 0),
        );

        let mut session = DeviceSession::new(Box::new(mock));
        let identity = session.resolve().await.unwrap();
        assert_eq!(identity.generation, Generation::Unknown("9.9.9".into()));
        assert_eq!(identity.serial_number, None);
    }

    #[tokio::test]
    async fn resolve_without_version_attribute_fails() {
        let mut mock = MockTransport::new();
        mock.expect(
            &request(commands::READ_FIRMWARE_HEADER, &[]),
            &ack(b"<FirmwareHeader ProductId='G4Receiver'/>"),
        );
        let mut session = DeviceSession::new(Box::new(mock));
        assert!(matches!(session.resolve().await, Err(Error::Decode(_))));
    }

    // -----------------------------------------------------------------
    // Page store
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn page_range_decodes_pair() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::EgvData), &range_response(2, 9));
        let session = DeviceSession::new(Box::new(mock));
        assert_eq!(
            session.page_range(RecordType::EgvData).await.unwrap(),
            (2, 9)
        );
    }

    #[tokio::test]
    async fn read_all_records_walks_pages_ascending() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::EgvData), &range_response(4, 5));
        mock.expect(
            &page_request(RecordType::EgvData, 4),
            &ack(&page_payload(
                RecordType::EgvData,
                1,
                4,
                &[egv_record(101, 4), egv_record(102, 4)],
            )),
        );
        mock.expect(
            &page_request(RecordType::EgvData, 5),
            &ack(&page_payload(RecordType::EgvData, 1, 5, &[egv_record(103, 4)])),
        );

        let session = DeviceSession::new(Box::new(mock));
        let records = session.read_all_records(RecordType::EgvData).await.unwrap();
        let values: Vec<_> = records.iter().filter_map(Record::glucose).collect();
        assert_eq!(
            values,
            vec![
                GlucoseReading::Value(101),
                GlucoseReading::Value(102),
                GlucoseReading::Value(103)
            ]
        );
    }

    #[tokio::test]
    async fn empty_partition_reads_nothing() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::MeterData), &range_response(0, 0));
        let session = DeviceSession::new(Box::new(mock));
        let records = session
            .read_all_records(RecordType::MeterData)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn single_page_partition_reads_once() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::EgvData), &range_response(5, 5));
        mock.expect(
            &page_request(RecordType::EgvData, 5),
            &ack(&page_payload(RecordType::EgvData, 1, 5, &[egv_record(140, 4)])),
        );
        let session = DeviceSession::new(Box::new(mock));
        let records = session.read_all_records(RecordType::EgvData).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn empty_page_stops_iteration_leniently() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::EgvData), &range_response(1, 3));
        mock.expect(
            &page_request(RecordType::EgvData, 1),
            &ack(&page_payload(RecordType::EgvData, 1, 1, &[egv_record(90, 4)])),
        );
        mock.expect(&page_request(RecordType::EgvData, 2), &ack(&[]));
        // Page 3 must never be requested.

        let session = DeviceSession::new(Box::new(mock));
        let records = session.read_all_records(RecordType::EgvData).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn header_echo_mismatch_is_fatal() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::EgvData), &range_response(3, 3));
        // Receiver echoes back the wrong page number.
        mock.expect(
            &page_request(RecordType::EgvData, 3),
            &ack(&page_payload(RecordType::EgvData, 1, 7, &[egv_record(90, 4)])),
        );
        let session = DeviceSession::new(Box::new(mock));
        assert!(matches!(
            session.read_all_records(RecordType::EgvData).await,
            Err(Error::ProtocolInvariant(_))
        ));
    }

    #[tokio::test]
    async fn page_crc_failure_retries_once() {
        let mut mock = MockTransport::new();
        let good = ack(&page_payload(RecordType::EgvData, 1, 2, &[egv_record(95, 4)]));
        let mut bad = good.clone();
        bad[10] ^= 0x04; // corrupt a payload byte; frame CRC now fails

        mock.expect(&range_request(RecordType::EgvData), &range_response(2, 2));
        mock.expect(&page_request(RecordType::EgvData, 2), &bad);
        mock.expect(&page_request(RecordType::EgvData, 2), &good);

        let session = DeviceSession::new(Box::new(mock));
        let records = session.read_all_records(RecordType::EgvData).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn page_crc_failure_twice_propagates() {
        let mut mock = MockTransport::new();
        let good = ack(&page_payload(RecordType::EgvData, 1, 2, &[egv_record(95, 4)]));
        let mut bad = good.clone();
        bad[10] ^= 0x04;

        mock.expect(&range_request(RecordType::EgvData), &range_response(2, 2));
        mock.expect(&page_request(RecordType::EgvData, 2), &bad.clone());
        mock.expect(&page_request(RecordType::EgvData, 2), &bad);

        let session = DeviceSession::new(Box::new(mock));
        assert!(matches!(
            session.read_all_records(RecordType::EgvData).await,
            Err(Error::Crc { .. })
        ));
    }

    // -----------------------------------------------------------------
    // Reverse pager
    // -----------------------------------------------------------------

    #[tokio::test]
    async fn reverse_pager_yields_newest_first() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::EgvData), &range_response(1, 2));
        mock.expect(
            &page_request(RecordType::EgvData, 2),
            &ack(&page_payload(
                RecordType::EgvData,
                1,
                2,
                &[egv_record(201, 4), egv_record(202, 4)],
            )),
        );
        mock.expect(
            &page_request(RecordType::EgvData, 1),
            &ack(&page_payload(RecordType::EgvData, 1, 1, &[egv_record(100, 4)])),
        );

        let session = DeviceSession::new(Box::new(mock));
        let mut pager = session
            .records_newest_first(RecordType::EgvData)
            .await
            .unwrap();
        assert_eq!(pager.remaining_pages(), 2);

        // Newest page first; within the page, newest record first.
        let newest = pager.next_page().await.unwrap().unwrap();
        let values: Vec<_> = newest.iter().filter_map(Record::glucose).collect();
        assert_eq!(
            values,
            vec![GlucoseReading::Value(202), GlucoseReading::Value(201)]
        );

        let older = pager.next_page().await.unwrap().unwrap();
        assert_eq!(older[0].glucose(), Some(GlucoseReading::Value(100)));

        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reverse_pager_stops_on_empty_page() {
        let mut mock = MockTransport::new();
        mock.expect(&range_request(RecordType::EgvData), &range_response(1, 2));
        mock.expect(&page_request(RecordType::EgvData, 2), &ack(&[]));

        let session = DeviceSession::new(Box::new(mock));
        let mut pager = session
            .records_newest_first(RecordType::EgvData)
            .await
            .unwrap();
        assert!(pager.next_page().await.unwrap().is_none());
        assert_eq!(pager.remaining_pages(), 0);
    }
}
