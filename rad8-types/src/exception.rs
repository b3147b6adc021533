//! Exception conditions reported through the `EXC` field.

use alloc::vec::Vec;
use core::fmt;

/// A condition the device reports in its exception bitmask.
///
/// Serialized as the human-readable name, which is what the feed has always
/// carried in `active_exc_list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceException {
    #[cfg_attr(feature = "serde", serde(rename = "No Sensor"))]
    NoSensor,
    #[cfg_attr(feature = "serde", serde(rename = "Defective Sensor"))]
    DefectiveSensor,
    #[cfg_attr(feature = "serde", serde(rename = "Low Perfusion"))]
    LowPerfusion,
    #[cfg_attr(feature = "serde", serde(rename = "Pulse Search"))]
    PulseSearch,
    #[cfg_attr(feature = "serde", serde(rename = "Interference"))]
    Interference,
    #[cfg_attr(feature = "serde", serde(rename = "Sensor Light"))]
    SensorLight,
    #[cfg_attr(feature = "serde", serde(rename = "Ambient Light"))]
    AmbientLight,
    #[cfg_attr(feature = "serde", serde(rename = "Unrecognized Sensor"))]
    UnrecognizedSensor,
    #[cfg_attr(feature = "serde", serde(rename = "reserved"))]
    Reserved,
    #[cfg_attr(feature = "serde", serde(rename = "Low Signal IQ"))]
    LowSignalIq,
    #[cfg_attr(feature = "serde", serde(rename = "Masimo SET"))]
    MasimoSet,
    /// Reported alone when the mask is all zero.
    #[cfg_attr(feature = "serde", serde(rename = "Normal operation, no exceptions"))]
    NormalOperation,
}

impl DeviceException {
    /// Display name as it appears on the feed.
    pub const fn name(&self) -> &'static str {
        match self {
            DeviceException::NoSensor => "No Sensor",
            DeviceException::DefectiveSensor => "Defective Sensor",
            DeviceException::LowPerfusion => "Low Perfusion",
            DeviceException::PulseSearch => "Pulse Search",
            DeviceException::Interference => "Interference",
            DeviceException::SensorLight => "Sensor Light",
            DeviceException::AmbientLight => "Ambient Light",
            DeviceException::UnrecognizedSensor => "Unrecognized Sensor",
            DeviceException::Reserved => "reserved",
            DeviceException::LowSignalIq => "Low Signal IQ",
            DeviceException::MasimoSet => "Masimo SET",
            DeviceException::NormalOperation => "Normal operation, no exceptions",
        }
    }
}

impl fmt::Display for DeviceException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered set of exception conditions decoded from one reading.
///
/// Recomputed every cycle. An empty set means no reading was decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ExceptionSet(pub Vec<DeviceException>);

impl ExceptionSet {
    /// The set reported for an all-zero mask.
    pub fn normal() -> Self {
        Self(alloc::vec![DeviceException::NormalOperation])
    }

    /// True if the device reported normal operation.
    pub fn is_normal(&self) -> bool {
        self.0 == [DeviceException::NormalOperation]
    }

    pub fn contains(&self, exception: DeviceException) -> bool {
        self.0.contains(&exception)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceException> {
        self.0.iter()
    }
}

impl FromIterator<DeviceException> for ExceptionSet {
    fn from_iter<I: IntoIterator<Item = DeviceException>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
