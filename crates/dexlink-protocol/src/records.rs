//! Binary record decoding, revision-branching table.
//!
//! Pure functions mapping `(record type, page revision, raw bytes, index)`
//! to typed [`Record`] values. All generation-specific bit packing lives
//! here: the layout for a record family is chosen by the revision carried in
//! the page header, so the same library decodes G4, G5, and G6 history
//! without being told which unit it is talking to.
//!
//! Every fixed layout ends in a CRC16 over the record's own bytes, checked
//! before any field is returned. Decode failures are typed errors scoped to
//! the single record -- a multi-page read can isolate and report them without
//! tearing down the session.

use dexlink_core::records::{
    CalibrationRecord, EgvRecord, EventRecord, G5InsertionRecord, G5MeterRecord,
    G5UserSettingsRecord, G6EgvRecord, G6UserSettingsRecord, InsertionRecord,
    LegacyCalibrationRecord, MeterRecord, Record, SensorRecord, XmlRecord,
};
use dexlink_core::{Error, GlucoseReading, RecordType, Result, TrendArrow, XmlFragment};

use crate::commands::{EGV_DISPLAY_ONLY_MASK, EGV_TREND_ARROW_MASK, EGV_VALUE_MASK};
use crate::crc::crc16;
use crate::pages::PageHeader;

// Fixed record sizes per (family, revision family), trailing CRC included.
const EGV_LEN: usize = 13;
const EGV_G6_LEN: usize = 18;
const SENSOR_LEN: usize = 20;
const EVENT_LEN: usize = 20;
const INSERTION_LEN: usize = 15;
const INSERTION_G5_LEN: usize = 29;
const METER_LEN: usize = 16;
const METER_G5_LEN: usize = 21;
const CAL_LEGACY_LEN: usize = 14;
const CAL_LEN: usize = 15;
const SETTINGS_G5_LEN: usize = 29;
const SETTINGS_G6_LEN: usize = 35;

/// The on-wire size of one record of `record_type` under `revision`.
///
/// Errors with [`Error::Unsupported`] for the families whose binary layout
/// the firmware has never published.
pub fn record_len(record_type: RecordType, revision: u8) -> Result<usize> {
    match record_type {
        RecordType::EgvData => Ok(if revision > 4 { EGV_G6_LEN } else { EGV_LEN }),
        RecordType::SensorData => Ok(SENSOR_LEN),
        RecordType::UserEventData => Ok(EVENT_LEN),
        RecordType::InsertionTime => Ok(if revision > 1 {
            INSERTION_G5_LEN
        } else {
            INSERTION_LEN
        }),
        RecordType::MeterData => Ok(if revision > 2 { METER_G5_LEN } else { METER_LEN }),
        RecordType::CalSet => Ok(if revision < 2 { CAL_LEGACY_LEN } else { CAL_LEN }),
        RecordType::UserSettingData => Ok(if revision >= 2 {
            SETTINGS_G6_LEN
        } else {
            SETTINGS_G5_LEN
        }),
        other => Err(Error::Unsupported(other.to_string())),
    }
}

/// Decode record number `index` of a page.
///
/// `data` is the page payload after the page header. The XML families
/// (manufacturing data, PC software parameter) hold a single document per
/// page rather than a record array and only accept `index` 0.
pub fn decode(record_type: RecordType, revision: u8, data: &[u8], index: usize) -> Result<Record> {
    if record_type.is_xml() {
        if index != 0 {
            return Err(Error::Decode(format!(
                "{record_type} pages hold a single document, record index {index} requested"
            )));
        }
        return decode_xml(data);
    }

    let len = record_len(record_type, revision)?;
    let raw = record_slice(data, index, len)?;
    check_record_crc(raw)?;

    match record_type {
        RecordType::EgvData if revision > 4 => decode_egv_g6(raw),
        RecordType::EgvData => decode_egv(raw),
        RecordType::SensorData => Ok(decode_sensor(raw)),
        RecordType::UserEventData => Ok(decode_event(raw)),
        RecordType::InsertionTime if revision > 1 => Ok(decode_insertion_g5(raw)),
        RecordType::InsertionTime => Ok(decode_insertion(raw)),
        RecordType::MeterData if revision > 2 => Ok(decode_meter_g5(raw)),
        RecordType::MeterData => Ok(decode_meter(raw)),
        RecordType::CalSet if revision < 2 => Ok(decode_calibration_legacy(raw)),
        RecordType::CalSet => Ok(decode_calibration(raw)),
        RecordType::UserSettingData if revision >= 2 => Ok(decode_settings_g6(raw)),
        RecordType::UserSettingData => Ok(decode_settings_g5(raw)),
        other => Err(Error::Unsupported(other.to_string())),
    }
}

/// Decode every record in a page, in stored order.
pub fn decode_page(header: &PageHeader, data: &[u8]) -> Result<Vec<Record>> {
    if header.record_type.is_xml() {
        return Ok(vec![decode(header.record_type, header.revision, data, 0)?]);
    }
    let mut records = Vec::with_capacity(header.record_count as usize);
    for index in 0..header.record_count as usize {
        records.push(decode(header.record_type, header.revision, data, index)?);
    }
    Ok(records)
}

fn record_slice(data: &[u8], index: usize, len: usize) -> Result<&[u8]> {
    let start = index * len;
    let end = start + len;
    data.get(start..end).ok_or_else(|| {
        Error::Decode(format!(
            "record {index} needs bytes {start}..{end} but the page payload holds {}",
            data.len()
        ))
    })
}

fn check_record_crc(raw: &[u8]) -> Result<()> {
    let crc_offset = raw.len() - 2;
    let expected = u16::from_le_bytes([raw[crc_offset], raw[crc_offset + 1]]);
    let computed = crc16(&raw[..crc_offset]);
    if expected != computed {
        return Err(Error::Crc { expected, computed });
    }
    Ok(())
}

fn u16_at(raw: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([raw[offset], raw[offset + 1]])
}

fn i16_at(raw: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([raw[offset], raw[offset + 1]])
}

fn u32_at(raw: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([raw[offset], raw[offset + 1], raw[offset + 2], raw[offset + 3]])
}

fn decode_egv(raw: &[u8]) -> Result<Record> {
    let packed = u16_at(raw, 8);
    Ok(Record::Egv(EgvRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        glucose: GlucoseReading::from_raw(packed & EGV_VALUE_MASK),
        trend: TrendArrow::from_raw(raw[10] & EGV_TREND_ARROW_MASK)?,
        display_only: packed & EGV_DISPLAY_ONLY_MASK != 0,
    }))
}

fn decode_egv_g6(raw: &[u8]) -> Result<Record> {
    let packed = u16_at(raw, 8);
    Ok(Record::EgvG6(G6EgvRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        glucose: GlucoseReading::from_raw(packed & EGV_VALUE_MASK),
        trend: TrendArrow::from_raw(raw[14] & EGV_TREND_ARROW_MASK)?,
        display_only: packed & EGV_DISPLAY_ONLY_MASK != 0,
        test_number: u32_at(raw, 10),
    }))
}

fn decode_sensor(raw: &[u8]) -> Record {
    Record::Sensor(SensorRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        unfiltered: u32_at(raw, 8),
        filtered: u32_at(raw, 12),
        rssi: i16_at(raw, 16),
    })
}

fn decode_event(raw: &[u8]) -> Record {
    Record::Event(EventRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        event_type: raw[8],
        event_sub_type: raw[9],
        event_seconds: u32_at(raw, 10),
        event_value: u32_at(raw, 14),
    })
}

fn decode_insertion(raw: &[u8]) -> Record {
    Record::Insertion(InsertionRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        insertion_seconds: u32_at(raw, 8),
        session_state: raw[12],
    })
}

fn decode_insertion_g5(raw: &[u8]) -> Record {
    Record::InsertionG5(G5InsertionRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        insertion_seconds: u32_at(raw, 8),
        session_state: raw[12],
        sensor_number: u32_at(raw, 13),
        transmitter_serial: ascii_field(&raw[17..27]),
    })
}

fn decode_meter(raw: &[u8]) -> Record {
    Record::Meter(MeterRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        meter_glucose: u16_at(raw, 8),
        meter_seconds: u32_at(raw, 10),
    })
}

fn decode_meter_g5(raw: &[u8]) -> Record {
    Record::MeterG5(G5MeterRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        meter_glucose: u16_at(raw, 8),
        record_subtype: raw[10],
        meter_seconds: u32_at(raw, 11),
        test_number: u32_at(raw, 15),
    })
}

fn decode_calibration_legacy(raw: &[u8]) -> Record {
    Record::CalibrationLegacy(LegacyCalibrationRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        calibration_glucose: u32_at(raw, 8),
    })
}

fn decode_calibration(raw: &[u8]) -> Record {
    Record::Calibration(CalibrationRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        calibration_glucose: u32_at(raw, 8),
        record_subtype: raw[12],
    })
}

fn decode_settings_g5(raw: &[u8]) -> Record {
    Record::UserSettingsG5(G5UserSettingsRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        transmitter_paired: u32_at(raw, 8),
        high_alert: u16_at(raw, 12),
        high_repeat: u16_at(raw, 14),
        low_alert: u16_at(raw, 16),
        low_repeat: u16_at(raw, 18),
        rise_rate: u16_at(raw, 20),
        fall_rate: u16_at(raw, 22),
        out_of_range_alert: u16_at(raw, 24),
        sounds_type: raw[26],
    })
}

fn decode_settings_g6(raw: &[u8]) -> Record {
    Record::UserSettingsG6(G6UserSettingsRecord {
        system_seconds: u32_at(raw, 0),
        display_seconds: u32_at(raw, 4),
        transmitter_paired: u32_at(raw, 8),
        high_alert: u16_at(raw, 12),
        high_repeat: u16_at(raw, 14),
        low_alert: u16_at(raw, 16),
        low_repeat: u16_at(raw, 18),
        rise_rate: u16_at(raw, 20),
        fall_rate: u16_at(raw, 22),
        out_of_range_alert: u16_at(raw, 24),
        sounds_type: raw[26],
        urgent_low_soon_repeat: u16_at(raw, 27),
        sensor_code: u32_at(raw, 29),
    })
}

fn decode_xml(data: &[u8]) -> Result<Record> {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    let text = std::str::from_utf8(&data[..end])
        .map_err(|e| Error::Decode(format!("XML page is not valid UTF-8: {e}")))?;
    Ok(Record::Xml(XmlRecord {
        fragment: XmlFragment(text.to_string()),
    }))
}

/// ASCII field, NUL-padded on the wire.
fn ascii_field(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
