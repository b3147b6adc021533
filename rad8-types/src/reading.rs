//! Reading - the fields carried by one line of device output.

use alloc::string::String;

/// Fields extracted from a single RAD-8 serial line.
///
/// Values are kept as the cleaned strings the device sent (unit and sign
/// characters stripped). A field the device reported as a placeholder
/// (`--`, `--.-`, ...) is `None`.
///
/// # Example
///
/// ```rust
/// use rad8_types::Reading;
///
/// let mut reading = Reading::new("05/20/21 14:06:02");
/// reading.spo2 = Some("098".into());
/// reading.bpm = Some("101".into());
///
/// assert_eq!(reading.spo2_percent(), Some(98));
/// assert_eq!(reading.pulse_rate(), Some(101));
/// assert_eq!(reading.perfusion_index(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Device clock when the line was produced (`MM/DD/YY HH:MM:SS`).
    #[cfg_attr(feature = "serde", serde(rename = "rad8_timestamp"))]
    pub device_timestamp: String,

    /// Device serial number (`SN`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "SN", skip_serializing_if = "Option::is_none")
    )]
    pub serial_number: Option<String>,

    /// Oxygen saturation in percent (`SPO2`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "SPO2", skip_serializing_if = "Option::is_none")
    )]
    pub spo2: Option<String>,

    /// Pulse rate in beats per minute (`BPM`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "BPM", skip_serializing_if = "Option::is_none")
    )]
    pub bpm: Option<String>,

    /// Perfusion index in percent (`PI`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "PI", skip_serializing_if = "Option::is_none")
    )]
    pub pi: Option<String>,

    /// Carboxyhemoglobin saturation (`SPCO`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "SPCO", skip_serializing_if = "Option::is_none")
    )]
    pub spco: Option<String>,

    /// Methemoglobin saturation (`SPMET`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "SPMET", skip_serializing_if = "Option::is_none")
    )]
    pub spmet: Option<String>,

    /// Desaturation index (`DESAT`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "DESAT", skip_serializing_if = "Option::is_none")
    )]
    pub desat: Option<String>,

    /// Perfusion index delta (`PIDELTA`). The sign is stripped by cleaning.
    #[cfg_attr(
        feature = "serde",
        serde(rename = "PIDELTA", skip_serializing_if = "Option::is_none")
    )]
    pub pi_delta: Option<String>,

    /// Raw hexadecimal alarm code (`ALARM`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "ALARM", skip_serializing_if = "Option::is_none")
    )]
    pub alarm: Option<String>,

    /// Raw hexadecimal exception code (`EXC`).
    #[cfg_attr(
        feature = "serde",
        serde(rename = "EXC", skip_serializing_if = "Option::is_none")
    )]
    pub exception: Option<String>,
}

impl Reading {
    /// Create a reading with only the device timestamp set.
    pub fn new(device_timestamp: impl Into<String>) -> Self {
        Self {
            device_timestamp: device_timestamp.into(),
            ..Default::default()
        }
    }

    /// SpO2 as a number, if the device reported one.
    pub fn spo2_percent(&self) -> Option<u8> {
        self.spo2.as_deref()?.parse().ok()
    }

    /// Pulse rate as a number, if the device reported one.
    pub fn pulse_rate(&self) -> Option<u16> {
        self.bpm.as_deref()?.parse().ok()
    }

    /// Perfusion index as a number, if the device reported one.
    pub fn perfusion_index(&self) -> Option<f32> {
        self.pi.as_deref()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_accessors_ignore_garbage() {
        let mut reading = Reading::new("01/01/21 00:00:00");
        reading.spo2 = Some("abc".into());
        reading.pi = Some("2.41".into());

        assert_eq!(reading.spo2_percent(), None);
        assert_eq!(reading.pulse_rate(), None);
        assert!((reading.perfusion_index().unwrap() - 2.41).abs() < f32::EPSILON);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_with_device_keys() {
        let mut reading = Reading::new("05/20/21 14:06:02");
        reading.spo2 = Some("098".into());
        reading.exception = Some("000824".into());

        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["rad8_timestamp"], "05/20/21 14:06:02");
        assert_eq!(json["SPO2"], "098");
        assert_eq!(json["EXC"], "000824");
        assert!(json.get("BPM").is_none());
    }
}
