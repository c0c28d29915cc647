//! USB serial port discovery for the receiver cradle.
//!
//! A thin enumeration wrapper, deliberately separate from the protocol
//! stack: the core only ever needs an open byte stream. Host applications
//! call [`find_receiver_port`] to locate a candidate port, then hand it to
//! [`SerialTransport::open`](crate::SerialTransport::open).

use serialport::{SerialPortInfo, SerialPortType};
use tracing::debug;

use dexlink_core::{Error, Result, DEXCOM_USB_PRODUCT, DEXCOM_USB_VENDOR};

/// Enumerate serial ports and return the first one that is a Dexcom
/// receiver, by USB vendor/product id.
///
/// Returns `Ok(None)` when no receiver is attached.
pub fn find_receiver_port() -> Result<Option<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| Error::Transport(format!("failed to enumerate serial ports: {e}")))?;
    let found = ports.into_iter().find_map(receiver_port_name);
    match &found {
        Some(port) => debug!(port = %port, "receiver port found"),
        None => debug!("no receiver port among enumerated serial ports"),
    }
    Ok(found)
}

/// Return the port name if this enumerated port is a receiver cradle.
fn receiver_port_name(info: SerialPortInfo) -> Option<String> {
    match info.port_type {
        SerialPortType::UsbPort(usb)
            if usb.vid == DEXCOM_USB_VENDOR && usb.pid == DEXCOM_USB_PRODUCT =>
        {
            Some(info.port_name)
        }
        _ => None,
    }
}
