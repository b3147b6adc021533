//! Bitmask decoding for the `EXC` and `ALARM` fields.
//!
//! Both fields are hex codes whose low digits are read as a binary string,
//! most-significant bit first. "Index" below always means the position in
//! that string, so index 0 is the highest bit of the mask.

use rad8_types::{AlarmBit, DeviceException, ExceptionSet};

use crate::error::BitmaskError;

/// Width of the exception mask in bits.
pub const EXCEPTION_BITS: u32 = 12;

/// Width of the alarm mask in bits.
pub const ALARM_BITS: u32 = 6;

/// Exception names by MSB-first index.
const EXCEPTION_TABLE: [DeviceException; EXCEPTION_BITS as usize] = [
    DeviceException::MasimoSet,
    DeviceException::LowSignalIq,
    DeviceException::Reserved,
    DeviceException::Reserved,
    DeviceException::UnrecognizedSensor,
    DeviceException::AmbientLight,
    DeviceException::SensorLight,
    DeviceException::Interference,
    DeviceException::PulseSearch,
    DeviceException::LowPerfusion,
    DeviceException::DefectiveSensor,
    DeviceException::NoSensor,
];

/// Parse the last `digits` hex digits of a field value.
pub fn hex_tail(field: &'static str, value: &str, digits: usize) -> Result<u16, BitmaskError> {
    let not_hex = || BitmaskError::NotHex {
        field,
        value: value.to_string(),
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(not_hex());
    }

    // All ASCII at this point, so byte slicing is safe
    let tail = &value[value.len().saturating_sub(digits)..];
    u16::from_str_radix(tail, 16).map_err(|_| not_hex())
}

/// Decode a 12-bit exception mask into its named conditions.
///
/// Conditions are listed from the lowest-order bit up. An all-zero mask
/// yields only [`DeviceException::NormalOperation`].
pub fn decode_exceptions(mask: u16) -> ExceptionSet {
    let mask = mask & ((1 << EXCEPTION_BITS) - 1);
    if mask == 0 {
        return ExceptionSet::normal();
    }

    (0..EXCEPTION_BITS as usize)
        .rev()
        .filter(|&index| mask & (1 << (EXCEPTION_BITS as usize - 1 - index)) != 0)
        .map(|index| EXCEPTION_TABLE[index])
        .collect()
}

/// The 6-bit alarm mask for one reading.
///
/// The vendor does not document this encoding. The mapping is inferred from
/// observed device behaviour:
///
/// - index 0 is the global "alarms silenced" flag
/// - indices 2, 3 and 4 are Low Heart Rate, High Heart Rate and Low O2
/// - Sensor Off shows up as indices 2 and 4 together, which is rewritten to
///   the otherwise unused lowest-order bit (index 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmMask(u8);

impl AlarmMask {
    const SILENCED_INDEX: u32 = 0;

    /// The mask Sensor Off collapses to: only the lowest-order bit set.
    pub const SENSOR_OFF: AlarmMask = AlarmMask(0b000001);

    /// Build a mask from the raw alarm value, applying the Sensor Off rule.
    pub fn from_raw(value: u8) -> Self {
        let mask = AlarmMask(value & ((1 << ALARM_BITS) - 1));
        if mask.is_set(2) && mask.is_set(4) {
            return Self::SENSOR_OFF;
        }
        mask
    }

    /// Parse the `ALARM` field value (last two hex digits).
    pub fn parse(value: &str) -> Result<Self, BitmaskError> {
        let raw = hex_tail("ALARM", value, 2)?;
        Ok(Self::from_raw(raw as u8))
    }

    /// Whether the bit at MSB-first `index` is set.
    pub fn is_set(&self, index: u32) -> bool {
        index < ALARM_BITS && self.0 & (1 << (ALARM_BITS - 1 - index)) != 0
    }

    /// Whether the given alarm condition is asserted.
    pub fn asserts(&self, bit: AlarmBit) -> bool {
        self.is_set(bit.code() as u32)
    }

    /// Whether alarms are silenced on the device.
    pub fn silenced(&self) -> bool {
        self.is_set(Self::SILENCED_INDEX)
    }

    /// The effective mask value.
    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// Parse the `EXC` field value (last three hex digits) into conditions.
pub fn parse_exceptions(value: &str) -> Result<ExceptionSet, BitmaskError> {
    hex_tail("EXC", value, 3).map(decode_exceptions)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Names keyed by numeric bit value, lowest first.
    const BY_VALUE: [(u16, DeviceException); 12] = [
        (0x001, DeviceException::NoSensor),
        (0x002, DeviceException::DefectiveSensor),
        (0x004, DeviceException::LowPerfusion),
        (0x008, DeviceException::PulseSearch),
        (0x010, DeviceException::Interference),
        (0x020, DeviceException::SensorLight),
        (0x040, DeviceException::AmbientLight),
        (0x080, DeviceException::UnrecognizedSensor),
        (0x100, DeviceException::Reserved),
        (0x200, DeviceException::Reserved),
        (0x400, DeviceException::LowSignalIq),
        (0x800, DeviceException::MasimoSet),
    ];

    #[test]
    fn every_exception_mask_matches_table() {
        for mask in 1u16..0x1000 {
            let expected: Vec<DeviceException> = BY_VALUE
                .iter()
                .filter(|(bit, _)| mask & bit != 0)
                .map(|(_, name)| *name)
                .collect();

            assert_eq!(decode_exceptions(mask).0, expected, "mask {:03x}", mask);
        }
    }

    #[test]
    fn zero_mask_is_normal_operation() {
        let set = decode_exceptions(0);
        assert_eq!(set.0, vec![DeviceException::NormalOperation]);
    }

    #[test]
    fn exception_field_uses_last_three_digits() {
        let set = parse_exceptions("000824").unwrap();
        assert_eq!(
            set.0,
            vec![
                DeviceException::LowPerfusion,
                DeviceException::SensorLight,
                DeviceException::MasimoSet
            ]
        );

        // Digits above the low three are ignored
        assert!(parse_exceptions("FFF000").unwrap().is_normal());
    }

    #[test]
    fn non_hex_fields_are_rejected() {
        assert_eq!(
            parse_exceptions("00G824"),
            Err(BitmaskError::NotHex {
                field: "EXC",
                value: "00G824".into()
            })
        );
        assert!(AlarmMask::parse("").is_err());
        assert!(AlarmMask::parse("00x1").is_err());
    }

    #[test]
    fn alarm_indices_are_msb_first() {
        let mask = AlarmMask::parse("0020").unwrap();
        assert!(mask.silenced());
        assert!(!mask.asserts(AlarmBit::LowHeartRate));

        let mask = AlarmMask::parse("0008").unwrap();
        assert!(mask.asserts(AlarmBit::LowHeartRate));
        assert!(!mask.silenced());

        assert!(AlarmMask::parse("0004").unwrap().asserts(AlarmBit::HighHeartRate));
        assert!(AlarmMask::parse("0002").unwrap().asserts(AlarmBit::LowO2));
        assert!(AlarmMask::parse("0001").unwrap().asserts(AlarmBit::SensorOff));
    }

    #[test]
    fn sensor_off_collapse_ignores_other_bits() {
        for value in 0u8..64 {
            let mask = AlarmMask::from_raw(value);
            let both = value & 0b001000 != 0 && value & 0b000010 != 0;

            if both {
                assert_eq!(mask, AlarmMask::SENSOR_OFF, "value {:06b}", value);
                assert!(mask.asserts(AlarmBit::SensorOff));
                assert!(!mask.silenced());
                for bit in [AlarmBit::LowHeartRate, AlarmBit::HighHeartRate, AlarmBit::LowO2] {
                    assert!(!mask.asserts(bit));
                }
            } else {
                assert_eq!(mask.bits(), value);
            }
        }
    }

    #[test]
    fn alarm_mask_keeps_six_bits() {
        // 0xC2: bits above the sixth are dropped, leaving Low O2
        let mask = AlarmMask::parse("00C2").unwrap();
        assert_eq!(mask.bits(), 0b000010);
        assert!(mask.asserts(AlarmBit::LowO2));
    }
}
