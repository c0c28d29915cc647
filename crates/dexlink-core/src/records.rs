//! Decoded record values from the receiver's paged database.
//!
//! [`Record`] is a closed tagged union with one variant per
//! (record type, revision family) pair, so every layout the firmware can
//! emit is a compile-time-visible case. Decoding from raw page bytes lives
//! in `dexlink-protocol`; these are the plain data carriers handed to the
//! persistence/UI layers.
//!
//! Timestamps are raw receiver-epoch offsets (seconds since 2009-01-01, see
//! [`RECEIVER_EPOCH_UNIX_SECS`](crate::types::RECEIVER_EPOCH_UNIX_SECS)).

use crate::types::{GlucoseReading, TrendArrow, XmlFragment};

/// An estimated glucose value, plain layout (page revision ≤ 4; G4 firmware).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgvRecord {
    /// Seconds since the receiver epoch, monotonic system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, user-visible display clock.
    pub display_seconds: u32,
    /// The glucose field with sentinel states preserved.
    pub glucose: GlucoseReading,
    /// Trend arrow packed next to the reading.
    pub trend: TrendArrow,
    /// Reading was shown to the user but excluded from calibration logic.
    pub display_only: bool,
}

/// An estimated glucose value, packed layout (page revision ≥ 5; G5/G6
/// firmware). Adds the test sequence number and packs trend and
/// display-only into combined fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G6EgvRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// The glucose field with sentinel states preserved.
    pub glucose: GlucoseReading,
    /// Trend arrow extracted from the packed trend field.
    pub trend: TrendArrow,
    /// Display-only bit from the packed glucose field.
    pub display_only: bool,
    /// Monotonic test sequence number.
    pub test_number: u32,
}

/// Raw sensor counts backing an EGV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Unfiltered sensor counts.
    pub unfiltered: u32,
    /// Filtered sensor counts.
    pub filtered: u32,
    /// Received signal strength of the transmitter link.
    pub rssi: i16,
}

/// A user-entered event (carbs, insulin, exercise, health).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Event family code.
    pub event_type: u8,
    /// Event sub-code within the family.
    pub event_sub_type: u8,
    /// When the user says the event happened, receiver epoch seconds.
    pub event_seconds: u32,
    /// Type-dependent magnitude (grams, units, minutes).
    pub event_value: u32,
}

/// Sensor session marker, plain layout (page revision ≤ 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// When the sensor was inserted, receiver epoch seconds.
    pub insertion_seconds: u32,
    /// Raw sensor session state code.
    pub session_state: u8,
}

/// Sensor session marker, G5/G6 layout (page revision ≥ 2). Adds the
/// sensor number and the paired transmitter's serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G5InsertionRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// When the sensor was inserted, receiver epoch seconds.
    pub insertion_seconds: u32,
    /// Raw sensor session state code.
    pub session_state: u8,
    /// Sensor number within the session history.
    pub sensor_number: u32,
    /// Transmitter serial, ASCII, NUL-padded on the wire.
    pub transmitter_serial: String,
}

/// A fingerstick meter entry, plain layout (page revision ≤ 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeterRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Meter reading in mg/dL.
    pub meter_glucose: u16,
    /// When the fingerstick was taken, receiver epoch seconds.
    pub meter_seconds: u32,
}

/// A fingerstick meter entry, G5/G6 layout (page revision ≥ 3). Adds the
/// record subtype and test sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G5MeterRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Meter reading in mg/dL.
    pub meter_glucose: u16,
    /// Record subtype code.
    pub record_subtype: u8,
    /// When the fingerstick was taken, receiver epoch seconds.
    pub meter_seconds: u32,
    /// Monotonic test sequence number.
    pub test_number: u32,
}

/// A calibration entry, legacy layout (page revision < 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCalibrationRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Calibration glucose in mg/dL.
    pub calibration_glucose: u32,
}

/// A calibration entry (page revision ≥ 2). Adds the record subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Calibration glucose in mg/dL.
    pub calibration_glucose: u32,
    /// Record subtype code.
    pub record_subtype: u8,
}

/// A user configuration snapshot, G5 layout (page revision < 2).
///
/// A new snapshot is appended every time the user changes any setting, so
/// this partition can hold a large number of near-identical records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G5UserSettingsRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Paired transmitter id, encoded.
    pub transmitter_paired: u32,
    /// High glucose alert threshold, mg/dL.
    pub high_alert: u16,
    /// High alert repeat interval, minutes.
    pub high_repeat: u16,
    /// Low glucose alert threshold, mg/dL.
    pub low_alert: u16,
    /// Low alert repeat interval, minutes.
    pub low_repeat: u16,
    /// Rise-rate alert threshold.
    pub rise_rate: u16,
    /// Fall-rate alert threshold.
    pub fall_rate: u16,
    /// Out-of-range alert delay, minutes.
    pub out_of_range_alert: u16,
    /// Alert sound profile code.
    pub sounds_type: u8,
}

/// A user configuration snapshot, G6 layout (page revision ≥ 2). Adds the
/// urgent-low-soon repeat interval and the sensor pairing code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct G6UserSettingsRecord {
    /// Seconds since the receiver epoch, system clock.
    pub system_seconds: u32,
    /// Seconds since the receiver epoch, display clock.
    pub display_seconds: u32,
    /// Paired transmitter id, encoded.
    pub transmitter_paired: u32,
    /// High glucose alert threshold, mg/dL.
    pub high_alert: u16,
    /// High alert repeat interval, minutes.
    pub high_repeat: u16,
    /// Low glucose alert threshold, mg/dL.
    pub low_alert: u16,
    /// Low alert repeat interval, minutes.
    pub low_repeat: u16,
    /// Rise-rate alert threshold.
    pub rise_rate: u16,
    /// Fall-rate alert threshold.
    pub fall_rate: u16,
    /// Out-of-range alert delay, minutes.
    pub out_of_range_alert: u16,
    /// Alert sound profile code.
    pub sounds_type: u8,
    /// Urgent-low-soon alert repeat interval, minutes.
    pub urgent_low_soon_repeat: u16,
    /// Sensor pairing code.
    pub sensor_code: u32,
}

/// The single XML document carried by a MANUFACTURING_DATA or
/// PC_SOFTWARE_PARAMETER page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlRecord {
    /// The document, trimmed at the page's NUL padding.
    pub fragment: XmlFragment,
}

/// A fully decoded record from the receiver's database.
///
/// One variant per (record type, revision family); the decoder in
/// `dexlink-protocol` selects the variant from the page header's revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// EGV, plain layout (revision ≤ 4).
    Egv(EgvRecord),
    /// EGV, packed G5/G6 layout (revision ≥ 5).
    EgvG6(G6EgvRecord),
    /// Raw sensor counts.
    Sensor(SensorRecord),
    /// User-entered event.
    Event(EventRecord),
    /// Sensor session marker, plain layout (revision ≤ 1).
    Insertion(InsertionRecord),
    /// Sensor session marker, G5/G6 layout (revision ≥ 2).
    InsertionG5(G5InsertionRecord),
    /// Meter entry, plain layout (revision ≤ 2).
    Meter(MeterRecord),
    /// Meter entry, G5/G6 layout (revision ≥ 3).
    MeterG5(G5MeterRecord),
    /// Calibration, legacy layout (revision < 2).
    CalibrationLegacy(LegacyCalibrationRecord),
    /// Calibration (revision ≥ 2).
    Calibration(CalibrationRecord),
    /// User settings, G5 layout (revision < 2).
    UserSettingsG5(G5UserSettingsRecord),
    /// User settings, G6 layout (revision ≥ 2).
    UserSettingsG6(G6UserSettingsRecord),
    /// Whole-page XML document.
    Xml(XmlRecord),
}

impl Record {
    /// System-clock timestamp, receiver epoch seconds.
    ///
    /// `None` only for whole-page XML documents, which carry no timestamp.
    pub fn system_seconds(&self) -> Option<u32> {
        match self {
            Record::Egv(r) => Some(r.system_seconds),
            Record::EgvG6(r) => Some(r.system_seconds),
            Record::Sensor(r) => Some(r.system_seconds),
            Record::Event(r) => Some(r.system_seconds),
            Record::Insertion(r) => Some(r.system_seconds),
            Record::InsertionG5(r) => Some(r.system_seconds),
            Record::Meter(r) => Some(r.system_seconds),
            Record::MeterG5(r) => Some(r.system_seconds),
            Record::CalibrationLegacy(r) => Some(r.system_seconds),
            Record::Calibration(r) => Some(r.system_seconds),
            Record::UserSettingsG5(r) => Some(r.system_seconds),
            Record::UserSettingsG6(r) => Some(r.system_seconds),
            Record::Xml(_) => None,
        }
    }

    /// The glucose field, for the record families that carry one.
    pub fn glucose(&self) -> Option<GlucoseReading> {
        match self {
            Record::Egv(r) => Some(r.glucose),
            Record::EgvG6(r) => Some(r.glucose),
            _ => None,
        }
    }

    /// The display-only flag, for EGV records.
    pub fn display_only(&self) -> Option<bool> {
        match self {
            Record::Egv(r) => Some(r.display_only),
            Record::EgvG6(r) => Some(r.display_only),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_accessors() {
        let rec = Record::Egv(EgvRecord {
            system_seconds: 1000,
            display_seconds: 1100,
            glucose: GlucoseReading::Value(120),
            trend: TrendArrow::Flat,
            display_only: false,
        });
        assert_eq!(rec.system_seconds(), Some(1000));
        assert_eq!(rec.glucose(), Some(GlucoseReading::Value(120)));
        assert_eq!(rec.display_only(), Some(false));
    }

    #[test]
    fn xml_record_has_no_timestamp() {
        let rec = Record::Xml(XmlRecord {
            fragment: XmlFragment("<ManufacturingParameters/>".into()),
        });
        assert_eq!(rec.system_seconds(), None);
        assert_eq!(rec.glucose(), None);
    }
}
