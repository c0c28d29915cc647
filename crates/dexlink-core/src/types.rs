//! Core types used throughout dexlink.
//!
//! These types form the receiver-agnostic vocabulary shared by the protocol
//! layers and by callers: the on-device record-store type indices, the
//! hardware generation classification, and the decoded value enumerations
//! (glucose sentinels, trend arrows, battery state).

use std::fmt;

use crate::error::{Error, Result};

/// USB vendor id of the Dexcom receiver cradle.
pub const DEXCOM_USB_VENDOR: u16 = 0x22A3;

/// USB product id of the Dexcom receiver cradle.
pub const DEXCOM_USB_PRODUCT: u16 = 0x0047;

/// The receiver epoch: 2009-01-01T00:00:00, expressed as Unix seconds.
///
/// Every timestamp the receiver stores is a `u32` count of seconds since
/// this instant, with no timezone. Conversion to calendar time is a caller
/// concern; the protocol layers hand out the raw offsets untouched.
pub const RECEIVER_EPOCH_UNIX_SECS: i64 = 1_230_768_000;

/// A record type in the receiver's paged on-board database.
///
/// The variants map to the stable wire indices 0..=13 used by the page-range
/// and page-read commands. The list is closed: the firmware defines exactly
/// these partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Serial number, hardware ids -- one XML blob.
    ManufacturingData,
    /// Firmware parameter blob; no binary layout published.
    FirmwareParameterData,
    /// PC software parameter -- one XML blob.
    PcSoftwareParameter,
    /// Raw sensor counts (unfiltered/filtered/RSSI).
    SensorData,
    /// Estimated glucose values, the periodic CGM readings.
    EgvData,
    /// Calibration set entries.
    CalSet,
    /// Deviation records; no binary layout published.
    Deviation,
    /// Sensor session insertion/removal markers.
    InsertionTime,
    /// Receiver internal log; no binary layout published.
    ReceiverLogData,
    /// Receiver error log; no binary layout published.
    ReceiverErrorData,
    /// Fingerstick meter entries used for calibration.
    MeterData,
    /// User-entered events (carbs, insulin, exercise, health).
    UserEventData,
    /// User configuration snapshots (G5/G6 receivers).
    UserSettingData,
    /// Sentinel marking the end of the partition table.
    MaxValue,
}

impl RecordType {
    /// All record types, in wire-index order.
    pub const ALL: [RecordType; 14] = [
        RecordType::ManufacturingData,
        RecordType::FirmwareParameterData,
        RecordType::PcSoftwareParameter,
        RecordType::SensorData,
        RecordType::EgvData,
        RecordType::CalSet,
        RecordType::Deviation,
        RecordType::InsertionTime,
        RecordType::ReceiverLogData,
        RecordType::ReceiverErrorData,
        RecordType::MeterData,
        RecordType::UserEventData,
        RecordType::UserSettingData,
        RecordType::MaxValue,
    ];

    /// The stable integer index this type has on the wire.
    pub fn wire_index(self) -> u8 {
        match self {
            RecordType::ManufacturingData => 0,
            RecordType::FirmwareParameterData => 1,
            RecordType::PcSoftwareParameter => 2,
            RecordType::SensorData => 3,
            RecordType::EgvData => 4,
            RecordType::CalSet => 5,
            RecordType::Deviation => 6,
            RecordType::InsertionTime => 7,
            RecordType::ReceiverLogData => 8,
            RecordType::ReceiverErrorData => 9,
            RecordType::MeterData => 10,
            RecordType::UserEventData => 11,
            RecordType::UserSettingData => 12,
            RecordType::MaxValue => 13,
        }
    }

    /// Map a wire index back to a record type.
    ///
    /// Any value outside 0..=13 is a decode-time error, never coerced.
    pub fn from_wire_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::Decode(format!("record type index {index} out of range")))
    }

    /// Whether pages of this type hold a single XML document rather than a
    /// repeated fixed-layout record array.
    pub fn is_xml(self) -> bool {
        matches!(
            self,
            RecordType::ManufacturingData | RecordType::PcSoftwareParameter
        )
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordType::ManufacturingData => "MANUFACTURING_DATA",
            RecordType::FirmwareParameterData => "FIRMWARE_PARAMETER_DATA",
            RecordType::PcSoftwareParameter => "PC_SOFTWARE_PARAMETER",
            RecordType::SensorData => "SENSOR_DATA",
            RecordType::EgvData => "EGV_DATA",
            RecordType::CalSet => "CAL_SET",
            RecordType::Deviation => "DEVIATION",
            RecordType::InsertionTime => "INSERTION_TIME",
            RecordType::ReceiverLogData => "RECEIVER_LOG_DATA",
            RecordType::ReceiverErrorData => "RECEIVER_ERROR_DATA",
            RecordType::MeterData => "METER_DATA",
            RecordType::UserEventData => "USER_EVENT_DATA",
            RecordType::UserSettingData => "USER_SETTING_DATA",
            RecordType::MaxValue => "MAX_VALUE",
        };
        write!(f, "{s}")
    }
}

/// Hardware/firmware family of an attached receiver.
///
/// Classified once per session from the firmware header's version string.
/// This is only a coarse hint for callers; record decoding always follows
/// the per-page revision, which is ground truth even when the two disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// G4 receivers (firmware 2.x, 3.x, 4.x).
    G4,
    /// G5 receivers (firmware 5.0.x).
    G5,
    /// G6 receivers (firmware 5.x other than 5.0).
    G6,
    /// A firmware version string this library does not recognize.
    ///
    /// Returned verbatim rather than guessed at.
    Unknown(String),
}

impl Generation {
    /// Classify a `FirmwareVersion` string from the firmware header.
    ///
    /// Version prefixes observed in the field: `5.0.1.043` is a G5 receiver,
    /// `5.1.1.022` is a G6 receiver.
    pub fn classify(version: &str) -> Generation {
        if version.starts_with("2.") || version.starts_with("3.") || version.starts_with("4.") {
            Generation::G4
        } else if version.starts_with("5.0.") {
            Generation::G5
        } else if version.starts_with("5.") {
            Generation::G6
        } else {
            Generation::Unknown(version.to_string())
        }
    }

    /// Whether this generation maintains the USER_SETTING_DATA partition.
    pub fn has_user_settings(&self) -> bool {
        matches!(self, Generation::G5 | Generation::G6)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::G4 => write!(f, "G4"),
            Generation::G5 => write!(f, "G5"),
            Generation::G6 => write!(f, "G6"),
            Generation::Unknown(v) => write!(f, "unknown ({v})"),
        }
    }
}

/// A decoded glucose field.
///
/// Raw values 0..=12 are sentinel states the receiver stores in place of a
/// measurement; anything above 12 is a real reading in mg/dL. The
/// distinction is preserved through decoding -- callers decide how to render
/// sentinels, the decoder never resolves them away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseReading {
    /// Raw 0: no value stored.
    None,
    /// Raw 1: sensor session not active.
    SensorNotActive,
    /// Raw 2: minimal deviation.
    MinimalDeviation,
    /// Raw 3: no antenna / transmitter out of range.
    NoAntenna,
    /// Raw 5: sensor not yet calibrated.
    SensorNotCalibrated,
    /// Raw 6: counts deviation.
    CountsDeviation,
    /// Raw 9: absolute deviation.
    AbsoluteDeviation,
    /// Raw 10: power deviation.
    PowerDeviation,
    /// Raw 12: bad RF link.
    BadRf,
    /// A sentinel code (≤ 12) with no published name.
    OtherSentinel(u16),
    /// A real measurement in mg/dL (always > 12).
    Value(u16),
}

impl GlucoseReading {
    /// Interpret a masked raw glucose value.
    pub fn from_raw(raw: u16) -> GlucoseReading {
        match raw {
            0 => GlucoseReading::None,
            1 => GlucoseReading::SensorNotActive,
            2 => GlucoseReading::MinimalDeviation,
            3 => GlucoseReading::NoAntenna,
            5 => GlucoseReading::SensorNotCalibrated,
            6 => GlucoseReading::CountsDeviation,
            9 => GlucoseReading::AbsoluteDeviation,
            10 => GlucoseReading::PowerDeviation,
            12 => GlucoseReading::BadRf,
            n if n <= 12 => GlucoseReading::OtherSentinel(n),
            n => GlucoseReading::Value(n),
        }
    }

    /// The measurement in mg/dL, or `None` for any sentinel state.
    pub fn mg_dl(&self) -> Option<u16> {
        match self {
            GlucoseReading::Value(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether this is a sentinel state rather than a measurement.
    pub fn is_sentinel(&self) -> bool {
        !matches!(self, GlucoseReading::Value(_))
    }
}

/// Trend arrow packed alongside each EGV reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendArrow {
    /// Raw 0: no arrow stored.
    None,
    /// Rising faster than 3 mg/dL/min.
    DoubleUp,
    /// Rising 2-3 mg/dL/min.
    SingleUp,
    /// Rising 1-2 mg/dL/min.
    FortyFiveUp,
    /// Steady.
    Flat,
    /// Falling 1-2 mg/dL/min.
    FortyFiveDown,
    /// Falling 2-3 mg/dL/min.
    SingleDown,
    /// Falling faster than 3 mg/dL/min.
    DoubleDown,
    /// Receiver could not compute a rate.
    NotComputable,
    /// Rate out of the displayable range.
    OutOfRange,
}

impl TrendArrow {
    /// Map a masked trend code (0..=9) to its arrow.
    ///
    /// Codes 10..=15 fit in the 4-bit field but have no meaning; they are a
    /// decode error rather than a silently wrong arrow.
    pub fn from_raw(raw: u8) -> Result<TrendArrow> {
        match raw {
            0 => Ok(TrendArrow::None),
            1 => Ok(TrendArrow::DoubleUp),
            2 => Ok(TrendArrow::SingleUp),
            3 => Ok(TrendArrow::FortyFiveUp),
            4 => Ok(TrendArrow::Flat),
            5 => Ok(TrendArrow::FortyFiveDown),
            6 => Ok(TrendArrow::SingleDown),
            7 => Ok(TrendArrow::DoubleDown),
            8 => Ok(TrendArrow::NotComputable),
            9 => Ok(TrendArrow::OutOfRange),
            n => Err(Error::Decode(format!("trend arrow code {n} out of range"))),
        }
    }
}

/// Charging state reported by READ_BATTERY_STATE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryState {
    /// On the cradle, charging.
    Charging,
    /// On battery.
    NotCharging,
    /// Thermistor fault.
    NtcFault,
    /// Battery needs replacement.
    BadBattery,
}

impl BatteryState {
    /// Map the wire code (1..=4) to a state.
    pub fn from_raw(raw: u8) -> Result<BatteryState> {
        match raw {
            1 => Ok(BatteryState::Charging),
            2 => Ok(BatteryState::NotCharging),
            3 => Ok(BatteryState::NtcFault),
            4 => Ok(BatteryState::BadBattery),
            n => Err(Error::Decode(format!("battery state code {n} out of range"))),
        }
    }
}

/// Display unit configured on the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseUnit {
    /// Milligrams per deciliter.
    MgDl,
    /// Millimoles per liter.
    MmolL,
}

impl GlucoseUnit {
    /// Map the wire code (1..=2) to a unit.
    pub fn from_raw(raw: u8) -> Result<GlucoseUnit> {
        match raw {
            1 => Ok(GlucoseUnit::MgDl),
            2 => Ok(GlucoseUnit::MmolL),
            n => Err(Error::Decode(format!("glucose unit code {n} out of range"))),
        }
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlucoseUnit::MgDl => write!(f, "mg/dL"),
            GlucoseUnit::MmolL => write!(f, "mmol/L"),
        }
    }
}

/// Hour format configured on the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    /// 24-hour display.
    TwentyFourHour,
    /// 12-hour display.
    TwelveHour,
}

impl ClockMode {
    /// Map the wire code (0..=1) to a mode.
    pub fn from_raw(raw: u8) -> Result<ClockMode> {
        match raw {
            0 => Ok(ClockMode::TwentyFourHour),
            1 => Ok(ClockMode::TwelveHour),
            n => Err(Error::Decode(format!("clock mode code {n} out of range"))),
        }
    }
}

/// An XML fragment the receiver emits (firmware header, manufacturing data,
/// PC software parameters).
///
/// The receiver's fragments are single elements whose payload is carried in
/// attributes. The raw document is preserved verbatim; attribute lookup is
/// provided by `dexlink-protocol`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlFragment(pub String);

impl XmlFragment {
    /// The raw fragment text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identity of an attached receiver, resolved once per session.
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    /// Hardware generation classified from the firmware version.
    pub generation: Generation,
    /// Serial number from manufacturing data, when available.
    pub serial_number: Option<String>,
    /// The raw firmware header document.
    pub firmware_header: XmlFragment,
    /// The `FirmwareVersion` attribute the classification was based on.
    pub firmware_version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_wire_indices_are_stable() {
        assert_eq!(RecordType::ManufacturingData.wire_index(), 0);
        assert_eq!(RecordType::SensorData.wire_index(), 3);
        assert_eq!(RecordType::EgvData.wire_index(), 4);
        assert_eq!(RecordType::CalSet.wire_index(), 5);
        assert_eq!(RecordType::InsertionTime.wire_index(), 7);
        assert_eq!(RecordType::MeterData.wire_index(), 10);
        assert_eq!(RecordType::UserEventData.wire_index(), 11);
        assert_eq!(RecordType::UserSettingData.wire_index(), 12);
        assert_eq!(RecordType::MaxValue.wire_index(), 13);
    }

    #[test]
    fn record_type_round_trips_through_wire_index() {
        for t in RecordType::ALL {
            assert_eq!(RecordType::from_wire_index(t.wire_index()).unwrap(), t);
        }
    }

    #[test]
    fn record_type_index_out_of_range_is_decode_error() {
        assert!(matches!(
            RecordType::from_wire_index(14),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            RecordType::from_wire_index(255),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn xml_types() {
        assert!(RecordType::ManufacturingData.is_xml());
        assert!(RecordType::PcSoftwareParameter.is_xml());
        assert!(!RecordType::EgvData.is_xml());
    }

    #[test]
    fn generation_classification() {
        assert_eq!(Generation::classify("4.2.1.12"), Generation::G4);
        assert_eq!(Generation::classify("2.0.1.5"), Generation::G4);
        assert_eq!(Generation::classify("3.0.1.0"), Generation::G4);
        assert_eq!(Generation::classify("5.0.1.043"), Generation::G5);
        assert_eq!(Generation::classify("5.1.1.022"), Generation::G6);
        assert_eq!(
            Generation::classify("9.9.9"),
            Generation::Unknown("9.9.9".to_string())
        );
    }

    #[test]
    fn generation_user_settings() {
        assert!(!Generation::G4.has_user_settings());
        assert!(Generation::G5.has_user_settings());
        assert!(Generation::G6.has_user_settings());
    }

    #[test]
    fn glucose_sentinels_stay_sentinels() {
        assert_eq!(GlucoseReading::from_raw(1), GlucoseReading::SensorNotActive);
        assert_eq!(
            GlucoseReading::from_raw(5),
            GlucoseReading::SensorNotCalibrated
        );
        assert_eq!(
            GlucoseReading::from_raw(9),
            GlucoseReading::AbsoluteDeviation
        );
        assert_eq!(GlucoseReading::from_raw(12), GlucoseReading::BadRf);
        assert_eq!(GlucoseReading::from_raw(4), GlucoseReading::OtherSentinel(4));
        for raw in [1u16, 5, 9, 12] {
            assert!(GlucoseReading::from_raw(raw).is_sentinel());
            assert_eq!(GlucoseReading::from_raw(raw).mg_dl(), None);
        }
    }

    #[test]
    fn glucose_values_above_twelve_are_readings() {
        assert_eq!(GlucoseReading::from_raw(13), GlucoseReading::Value(13));
        assert_eq!(GlucoseReading::from_raw(400), GlucoseReading::Value(400));
        assert_eq!(GlucoseReading::from_raw(400).mg_dl(), Some(400));
    }

    #[test]
    fn trend_arrows_decode() {
        assert_eq!(TrendArrow::from_raw(4).unwrap(), TrendArrow::Flat);
        assert_eq!(TrendArrow::from_raw(9).unwrap(), TrendArrow::OutOfRange);
        assert!(matches!(TrendArrow::from_raw(10), Err(Error::Decode(_))));
        assert!(matches!(TrendArrow::from_raw(15), Err(Error::Decode(_))));
    }

    #[test]
    fn battery_state_decodes() {
        assert_eq!(BatteryState::from_raw(1).unwrap(), BatteryState::Charging);
        assert_eq!(BatteryState::from_raw(4).unwrap(), BatteryState::BadBattery);
        assert!(matches!(BatteryState::from_raw(0), Err(Error::Decode(_))));
        assert!(matches!(BatteryState::from_raw(5), Err(Error::Decode(_))));
    }

    #[test]
    fn glucose_unit_decodes() {
        assert_eq!(GlucoseUnit::from_raw(1).unwrap(), GlucoseUnit::MgDl);
        assert_eq!(GlucoseUnit::from_raw(2).unwrap(), GlucoseUnit::MmolL);
        assert!(matches!(GlucoseUnit::from_raw(0), Err(Error::Decode(_))));
    }

    #[test]
    fn clock_mode_decodes() {
        assert_eq!(ClockMode::from_raw(0).unwrap(), ClockMode::TwentyFourHour);
        assert_eq!(ClockMode::from_raw(1).unwrap(), ClockMode::TwelveHour);
        assert!(matches!(ClockMode::from_raw(2), Err(Error::Decode(_))));
    }
}
