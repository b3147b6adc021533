//! Alarm conditions and their lifecycle records.

use alloc::string::{String, ToString};
use core::fmt;

/// One of the alarm conditions tracked from the `ALARM` field.
///
/// The numeric code is the condition's index in the MSB-first alarm mask and
/// is what the feed carries as `bit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub enum AlarmBit {
    LowHeartRate = 2,
    HighHeartRate = 3,
    LowO2 = 4,
    /// Synthesized from a combination of two raw bits.
    SensorOff = 5,
}

impl AlarmBit {
    /// Every tracked condition, in ascending code order.
    pub const ALL: [AlarmBit; 4] = [
        AlarmBit::LowHeartRate,
        AlarmBit::HighHeartRate,
        AlarmBit::LowO2,
        AlarmBit::SensorOff,
    ];

    /// Fixed integer code of this condition.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Look up a condition by its code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(AlarmBit::LowHeartRate),
            3 => Some(AlarmBit::HighHeartRate),
            4 => Some(AlarmBit::LowO2),
            5 => Some(AlarmBit::SensorOff),
            _ => None,
        }
    }

    /// Human-readable alarm text.
    pub const fn text(self) -> &'static str {
        match self {
            AlarmBit::LowHeartRate => "Low Heart Rate",
            AlarmBit::HighHeartRate => "High Heart Rate",
            AlarmBit::LowO2 => "Low O2",
            AlarmBit::SensorOff => "Sensor Off",
        }
    }
}

impl fmt::Display for AlarmBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Error for a code that does not name a tracked alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownAlarmBit(pub u8);

impl fmt::Display for UnknownAlarmBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown alarm bit {}", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownAlarmBit {}

impl TryFrom<u8> for AlarmBit {
    type Error = UnknownAlarmBit;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        AlarmBit::from_code(code).ok_or(UnknownAlarmBit(code))
    }
}

impl From<AlarmBit> for u8 {
    fn from(bit: AlarmBit) -> Self {
        bit.code()
    }
}

/// An alarm condition that is currently asserted.
///
/// The end timestamps stay `None` while the alarm is active; they exist so
/// active and resolved alarms share one shape on the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActiveAlarm {
    pub bit: AlarmBit,
    pub alarm_text: String,
    pub silenced: bool,
    pub start_interface_timestamp: String,
    #[cfg_attr(feature = "serde", serde(rename = "start_rad8_timestamp"))]
    pub start_device_timestamp: String,
    pub end_interface_timestamp: Option<String>,
    #[cfg_attr(feature = "serde", serde(rename = "end_rad8_timestamp"))]
    pub end_device_timestamp: Option<String>,
}

impl ActiveAlarm {
    /// Open a new alarm starting at the given timestamps.
    pub fn new(
        bit: AlarmBit,
        silenced: bool,
        interface_timestamp: impl Into<String>,
        device_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            bit,
            alarm_text: bit.text().to_string(),
            silenced,
            start_interface_timestamp: interface_timestamp.into(),
            start_device_timestamp: device_timestamp.into(),
            end_interface_timestamp: None,
            end_device_timestamp: None,
        }
    }

    /// Close the alarm at the given timestamps.
    pub fn resolve(
        self,
        interface_timestamp: impl Into<String>,
        device_timestamp: impl Into<String>,
    ) -> HistoryEntry {
        HistoryEntry {
            bit: self.bit,
            alarm_text: self.alarm_text,
            silenced: self.silenced,
            start_interface_timestamp: self.start_interface_timestamp,
            start_device_timestamp: self.start_device_timestamp,
            end_interface_timestamp: interface_timestamp.into(),
            end_device_timestamp: device_timestamp.into(),
        }
    }
}

/// A resolved alarm. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HistoryEntry {
    pub bit: AlarmBit,
    pub alarm_text: String,
    /// Silence flag as of the cycle that resolved the alarm.
    ///
    /// History files written by older bridges store this as `"0"`/`"1"`.
    #[cfg_attr(feature = "serde", serde(deserialize_with = "lenient_flag::deserialize"))]
    pub silenced: bool,
    pub start_interface_timestamp: String,
    #[cfg_attr(feature = "serde", serde(rename = "start_rad8_timestamp"))]
    pub start_device_timestamp: String,
    pub end_interface_timestamp: String,
    #[cfg_attr(feature = "serde", serde(rename = "end_rad8_timestamp"))]
    pub end_device_timestamp: String,
}

/// Accepts either a JSON bool or the `"0"`/`"1"` strings older feeds used.
#[cfg(feature = "serde")]
mod lenient_flag {
    use alloc::string::String;

    use serde::{de, Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Flag::deserialize(deserializer)? {
            Flag::Bool(flag) => Ok(flag),
            Flag::Text(text) => match text.as_str() {
                "0" => Ok(false),
                "1" => Ok(true),
                other => Err(de::Error::invalid_value(
                    de::Unexpected::Str(other),
                    &"a bool or \"0\"/\"1\"",
                )),
            },
        }
    }
}
