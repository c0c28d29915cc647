//! Command ids and response codes of the receiver link protocol.
//!
//! These are fixed wire values burned into the receiver firmware; the list
//! is closed. Commands this library never issues (the write side, database
//! erase, shutdown) are still named here because they are part of the same
//! vocabulary and show up in captured traffic.

/// Null response.
pub const NULL: u8 = 0;
/// Positive acknowledgement; data responses also carry this code.
pub const ACK: u8 = 1;
/// Negative acknowledgement.
pub const NAK: u8 = 2;
/// The receiver did not recognize the command id.
pub const INVALID_COMMAND: u8 = 3;
/// A parameter was out of range for the command.
pub const INVALID_PARAM: u8 = 4;
/// The receiver saw a short or malformed frame.
pub const INCOMPLETE_PACKET_RECEIVED: u8 = 5;
/// Internal receiver error.
pub const RECEIVER_ERROR: u8 = 6;
/// The command is not valid in the receiver's current mode.
pub const INVALID_MODE: u8 = 7;

/// Liveness check; the receiver answers with a bare ACK.
pub const PING: u8 = 10;
/// Read the firmware header XML document.
pub const READ_FIRMWARE_HEADER: u8 = 11;
/// Read the database partition table XML document.
pub const READ_DATABASE_PARTITION_INFO: u8 = 15;
/// Read the first/last page numbers for one record type.
pub const READ_DATABASE_PAGE_RANGE: u8 = 16;
/// Read one or more database pages.
pub const READ_DATABASE_PAGES: u8 = 17;
/// Read a bare page header.
pub const READ_DATABASE_PAGE_HEADER: u8 = 18;
/// Read the paired transmitter id (ASCII).
pub const READ_TRANSMITTER_ID: u8 = 25;
/// Write the paired transmitter id.
pub const WRITE_TRANSMITTER_ID: u8 = 26;
/// Read the configured language code.
pub const READ_LANGUAGE: u8 = 27;
/// Write the configured language code.
pub const WRITE_LANGUAGE: u8 = 28;
/// Read the display-time offset, signed seconds.
pub const READ_DISPLAY_TIME_OFFSET: u8 = 29;
/// Write the display-time offset.
pub const WRITE_DISPLAY_TIME_OFFSET: u8 = 30;
/// Read the real-time clock, receiver epoch seconds.
pub const READ_RTC: u8 = 31;
/// Reboot the receiver.
pub const RESET_RECEIVER: u8 = 32;
/// Read the battery charge percentage.
pub const READ_BATTERY_LEVEL: u8 = 33;
/// Read the system clock, receiver epoch seconds.
pub const READ_SYSTEM_TIME: u8 = 34;
/// Read the system-time offset, signed seconds.
pub const READ_SYSTEM_TIME_OFFSET: u8 = 35;
/// Write the system clock.
pub const WRITE_SYSTEM_TIME: u8 = 36;
/// Read the configured glucose display unit.
pub const READ_GLUCOSE_UNIT: u8 = 37;
/// Write the glucose display unit.
pub const WRITE_GLUCOSE_UNIT: u8 = 38;
/// Read the blinded-display flag.
pub const READ_BLINDED_MODE: u8 = 39;
/// Write the blinded-display flag.
pub const WRITE_BLINDED_MODE: u8 = 40;
/// Read the 12/24-hour clock mode.
pub const READ_CLOCK_MODE: u8 = 41;
/// Write the clock mode.
pub const WRITE_CLOCK_MODE: u8 = 42;
/// Read the device mode word.
pub const READ_DEVICE_MODE: u8 = 43;
/// Erase the on-board database.
pub const ERASE_DATABASE: u8 = 45;
/// Power the receiver down.
pub const SHUTDOWN_RECEIVER: u8 = 46;
/// Write the PC software parameter blob.
pub const WRITE_PC_PARAMETERS: u8 = 47;
/// Read the battery charging state.
pub const READ_BATTERY_STATE: u8 = 48;
/// Read the hardware board id.
pub const READ_HARDWARE_BOARD_ID: u8 = 49;
/// Read the firmware settings XML document.
pub const READ_FIRMWARE_SETTINGS: u8 = 54;
/// Read the setup-wizard enable flag.
pub const READ_ENABLE_SETUP_WIZARD_FLAG: u8 = 55;
/// Read the setup-wizard progress state.
pub const READ_SETUP_WIZARD_STATE: u8 = 57;
/// Read the charger current setting.
pub const READ_CHARGER_CURRENT_SETTING: u8 = 59;
/// Write the charger current setting.
pub const WRITE_CHARGER_CURRENT_SETTING: u8 = 60;
/// One past the highest command id this firmware family defines.
pub const MAX_COMMAND: u8 = 61;

/// EGV packed-field mask: the glucose value occupies the low 10 bits.
pub const EGV_VALUE_MASK: u16 = 0x3FF;
/// EGV packed-field mask: bit 15 flags a display-only reading.
pub const EGV_DISPLAY_ONLY_MASK: u16 = 0x8000;
/// EGV packed-field mask: the trend arrow occupies the low 4 bits.
pub const EGV_TREND_ARROW_MASK: u8 = 0xF;

/// Symbolic name of a response code, for diagnostics.
pub fn response_name(code: u8) -> &'static str {
    match code {
        NULL => "NULL",
        ACK => "ACK",
        NAK => "NAK",
        INVALID_COMMAND => "INVALID_COMMAND",
        INVALID_PARAM => "INVALID_PARAM",
        INCOMPLETE_PACKET_RECEIVED => "INCOMPLETE_PACKET_RECEIVED",
        RECEIVER_ERROR => "RECEIVER_ERROR",
        INVALID_MODE => "INVALID_MODE",
        _ => "UNKNOWN",
    }
}
