//! Attribute extraction for the receiver's XML fragments.
//!
//! The receiver emits a handful of XML documents (firmware header,
//! manufacturing parameters, partition table) that are all single elements
//! carrying their payload in attributes:
//!
//! ```text
//! <FirmwareHeader SchemaVersion='1' ProductId='G4Receiver'
//!                 FirmwareVersion='4.2.1.012' .../>
//! ```
//!
//! Nothing in this corpus needs a general XML parser -- a focused scanner
//! over `name='value'` / `name="value"` pairs covers every document the
//! firmware produces, and the raw fragment is always preserved for callers
//! that want the document itself.

/// Extract the value of `name` from an attribute-style XML fragment.
///
/// Matches whole attribute names only (`Version` will not match inside
/// `FirmwareVersion`) and accepts either quote style. Returns `None` when
/// the attribute is absent or malformed.
pub fn attribute<'a>(fragment: &'a str, name: &str) -> Option<&'a str> {
    let bytes = fragment.as_bytes();
    let mut search_from = 0;
    while let Some(rel) = fragment[search_from..].find(name) {
        let start = search_from + rel;
        search_from = start + 1;

        // Attribute names are delimited by whitespace on the left...
        if start == 0 || !bytes[start - 1].is_ascii_whitespace() {
            continue;
        }
        // ...and by `=` (optionally padded) on the right.
        let mut pos = start + name.len();
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || bytes[pos] != b'=' {
            continue;
        }
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if pos >= bytes.len() || (bytes[pos] != b'\'' && bytes[pos] != b'"') {
            continue;
        }
        let quote = bytes[pos];
        let value_start = pos + 1;
        let value_len = fragment[value_start..].find(quote as char)?;
        return Some(&fragment[value_start..value_start + value_len]);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRMWARE_HEADER: &str = "<FirmwareHeader SchemaVersion='1' ApiVersion='2.2.0.0' \
         ProductId='G4Receiver' ProductName='Dexcom G4 Receiver' \
         SoftwareNumber='SW10050' FirmwareVersion='4.2.1.012' \
         PortVersion='4.6.4.45' RFVersion='1.0.0.27'/>";

    #[test]
    fn extracts_single_quoted_attribute() {
        assert_eq!(
            attribute(FIRMWARE_HEADER, "FirmwareVersion"),
            Some("4.2.1.012")
        );
        assert_eq!(attribute(FIRMWARE_HEADER, "ProductId"), Some("G4Receiver"));
    }

    #[test]
    fn extracts_double_quoted_attribute() {
        let doc = r#"<ManufacturingParameters SerialNumber="SM41234567" HardwareId="13"/>"#;
        assert_eq!(attribute(doc, "SerialNumber"), Some("SM41234567"));
        assert_eq!(attribute(doc, "HardwareId"), Some("13"));
    }

    #[test]
    fn whole_name_matching_only() {
        // "Version" appears inside several attribute names; none of those
        // may satisfy a lookup for the bare suffix.
        assert_eq!(attribute(FIRMWARE_HEADER, "Version"), None);
        // And a prefix of a real name must not match either.
        assert_eq!(attribute(FIRMWARE_HEADER, "Firmware"), None);
    }

    #[test]
    fn missing_attribute_is_none() {
        assert_eq!(attribute(FIRMWARE_HEADER, "BatteryLevel"), None);
        assert_eq!(attribute("", "FirmwareVersion"), None);
    }

    #[test]
    fn padded_equals_sign() {
        let doc = "<X Value = '42'/>";
        assert_eq!(attribute(doc, "Value"), Some("42"));
    }

    #[test]
    fn values_with_spaces() {
        assert_eq!(
            attribute(FIRMWARE_HEADER, "ProductName"),
            Some("Dexcom G4 Receiver")
        );
    }

    #[test]
    fn unterminated_value_is_none() {
        let doc = "<X Value='42";
        assert_eq!(attribute(doc, "Value"), None);
    }
}
