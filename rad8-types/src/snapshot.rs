//! Snapshot - the complete state published for one poll cycle.

use alloc::string::String;
use alloc::vec::Vec;

use crate::{ActiveAlarm, ExceptionSet, HistoryEntry, Reading};

/// The state of the bridge after one poll cycle.
///
/// This is the unit pushed to feed clients. A snapshot is built once per
/// cycle and never modified afterwards.
///
/// # Example
///
/// ```rust
/// use rad8_types::Snapshot;
///
/// // Device unplugged: no reading this cycle
/// let snapshot = Snapshot::builder("05/20/21 14:06:03").build();
///
/// assert!(!snapshot.transport_connected);
/// assert!(!snapshot.data_received);
/// assert!(snapshot.reading.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Bridge clock when the cycle ran (`MM/DD/YY HH:MM:SS`).
    pub interface_timestamp: String,

    /// Whether the serial transport was open at the start of the cycle.
    #[cfg_attr(feature = "serde", serde(rename = "serial_conn"))]
    pub transport_connected: bool,

    /// Whether a line was read and decoded this cycle.
    #[cfg_attr(feature = "serde", serde(rename = "serial_data"))]
    pub data_received: bool,

    /// The decoded reading, present only when `data_received` is set.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub reading: Option<Reading>,

    /// Exception conditions from this cycle's reading.
    #[cfg_attr(feature = "serde", serde(rename = "active_exc_list", default))]
    pub exceptions: ExceptionSet,

    /// Alarms currently asserted, in ascending bit order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub active_alarms: Vec<ActiveAlarm>,

    /// Resolved alarms, newest first.
    #[cfg_attr(feature = "serde", serde(rename = "alarm_history", default))]
    pub history: Vec<HistoryEntry>,
}

impl Snapshot {
    /// Create a builder for a snapshot taken at the given interface time.
    pub fn builder(interface_timestamp: impl Into<String>) -> SnapshotBuilder {
        SnapshotBuilder::new(interface_timestamp)
    }

    /// True if any alarm is currently asserted.
    pub fn has_active_alarms(&self) -> bool {
        !self.active_alarms.is_empty()
    }

    /// True if every active alarm has been silenced on the device.
    pub fn all_silenced(&self) -> bool {
        self.active_alarms.iter().all(|a| a.silenced)
    }
}

/// Builder for constructing `Snapshot` instances.
///
/// `data_received` is derived from whether a reading was supplied, so a
/// snapshot can never claim data without carrying it.
#[derive(Debug)]
pub struct SnapshotBuilder {
    interface_timestamp: String,
    transport_connected: bool,
    reading: Option<Reading>,
    exceptions: ExceptionSet,
    active_alarms: Vec<ActiveAlarm>,
    history: Vec<HistoryEntry>,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new(interface_timestamp: impl Into<String>) -> Self {
        Self {
            interface_timestamp: interface_timestamp.into(),
            transport_connected: false,
            reading: None,
            exceptions: ExceptionSet::default(),
            active_alarms: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn transport_connected(mut self, connected: bool) -> Self {
        self.transport_connected = connected;
        self
    }

    pub fn reading(mut self, reading: Reading) -> Self {
        self.reading = Some(reading);
        self
    }

    pub fn exceptions(mut self, exceptions: ExceptionSet) -> Self {
        self.exceptions = exceptions;
        self
    }

    pub fn active_alarms(mut self, alarms: Vec<ActiveAlarm>) -> Self {
        self.active_alarms = alarms;
        self
    }

    pub fn history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> Snapshot {
        Snapshot {
            interface_timestamp: self.interface_timestamp,
            transport_connected: self.transport_connected,
            data_received: self.reading.is_some(),
            reading: self.reading,
            exceptions: self.exceptions,
            active_alarms: self.active_alarms,
            history: self.history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AlarmBit, DeviceException};

    fn sample() -> Snapshot {
        let mut reading = Reading::new("05/20/21 14:06:02");
        reading.serial_number = Some("0000182948".into());
        reading.spo2 = Some("098".into());
        reading.bpm = Some("101".into());
        reading.alarm = Some("0010".into());
        reading.exception = Some("000824".into());

        let resolved = ActiveAlarm::new(AlarmBit::LowHeartRate, false, "i1", "d1").resolve("i2", "d2");

        Snapshot::builder("05/20/21 14:06:03")
            .transport_connected(true)
            .reading(reading)
            .exceptions(
                [DeviceException::LowPerfusion, DeviceException::SensorLight]
                    .into_iter()
                    .collect(),
            )
            .active_alarms(vec![ActiveAlarm::new(AlarmBit::LowO2, true, "i3", "d3")])
            .history(vec![resolved])
            .build()
    }

    #[test]
    fn builder_derives_data_flag() {
        let snapshot = sample();
        assert!(snapshot.data_received);
        assert!(snapshot.transport_connected);
        assert!(snapshot.has_active_alarms());
        assert!(snapshot.all_silenced());

        let empty = Snapshot::builder("t").transport_connected(true).build();
        assert!(!empty.data_received);
        assert!(!empty.has_active_alarms());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip() {
        let snapshot = sample();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(snapshot, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_roundtrip_without_reading() {
        let snapshot = Snapshot::builder("05/20/21 14:06:03").build();

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("reading").is_none());
        assert_eq!(json["serial_conn"], false);
        assert_eq!(json["serial_data"], false);
        assert_eq!(json["active_exc_list"], serde_json::json!([]));

        let parsed: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(snapshot, parsed);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn wire_keys_match_legacy_feed() {
        let json = serde_json::to_value(sample()).unwrap();
        let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();

        assert_eq!(
            keys,
            vec![
                "active_alarms",
                "active_exc_list",
                "alarm_history",
                "interface_timestamp",
                "reading",
                "serial_conn",
                "serial_data",
            ]
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn history_list_roundtrip() {
        let history = sample().history;

        let json = serde_json::to_string(&history).unwrap();
        let parsed: Vec<HistoryEntry> = serde_json::from_str(&json).unwrap();

        assert_eq!(history, parsed);
    }
}
