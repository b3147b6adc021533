//! Decoder for the RAD-8 serial line protocol.
//!
//! The device emits one line per reading:
//!
//! ```text
//! 05/20/21 14:06:02 SN=0000182948 SPO2=098% BPM=101 PI=--.--% SPCO=--.-% SPMET=--.-% DESAT=-- PIDELTA=+-- ALARM=0010 EXC=000824
//! ```
//!
//! Decoding is a pure function of the line. Anything that does not parse is
//! reported as a [`DecodeError`] and the caller treats the cycle as having
//! no data.

mod mask;

pub use mask::{decode_exceptions, hex_tail, parse_exceptions, AlarmMask, ALARM_BITS, EXCEPTION_BITS};

use rad8_types::{ExceptionSet, Reading};
use tracing::trace;

use crate::error::{BitmaskError, DecodeError};

/// Everything extracted from one device line.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub reading: Reading,
    pub exceptions: ExceptionSet,
    pub alarms: AlarmMask,
}

/// Strip placeholder, unit and sign characters from a field value.
///
/// `.-` is removed before single dashes so `--.--` cleans to nothing.
pub fn clean_value(value: &str) -> String {
    value
        .replace(".-", "")
        .replace('-', "")
        .replace('%', "")
        .replace('+', "")
}

/// Decode one raw line from the device.
pub fn decode_line(line: &str) -> Result<Decoded, DecodeError> {
    let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
    let mut tokens = line.split_whitespace();

    let (date, time) = match (tokens.next(), tokens.next()) {
        (Some(date), Some(time)) => (date, time),
        _ => return Err(DecodeError::Truncated(line.to_string())),
    };
    let mut reading = Reading::new(format!("{} {}", date, time));

    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| DecodeError::MalformedToken(token.to_string()))?;

        let slot = match key {
            "SN" => &mut reading.serial_number,
            "SPO2" => &mut reading.spo2,
            "BPM" => &mut reading.bpm,
            "PI" => &mut reading.pi,
            "SPCO" => &mut reading.spco,
            "SPMET" => &mut reading.spmet,
            "DESAT" => &mut reading.desat,
            "PIDELTA" => &mut reading.pi_delta,
            "ALARM" => &mut reading.alarm,
            "EXC" => &mut reading.exception,
            _ => {
                trace!("Ignoring unknown field {}", key);
                continue;
            }
        };

        let value = clean_value(value);
        *slot = (!value.is_empty()).then_some(value);
    }

    let exc = reading
        .exception
        .as_deref()
        .ok_or(BitmaskError::Missing("EXC"))?;
    let exceptions = parse_exceptions(exc)?;

    let alarm = reading
        .alarm
        .as_deref()
        .ok_or(BitmaskError::Missing("ALARM"))?;
    let alarms = AlarmMask::parse(alarm)?;

    Ok(Decoded {
        reading,
        exceptions,
        alarms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rad8_types::{AlarmBit, DeviceException};

    const SAMPLE: &str = "05/20/21 14:06:02 SN=0000182948 SPO2=098% BPM=101 PI=--.--% SPCO=--.-% SPMET=--.-% DESAT=-- PIDELTA=+-- ALARM=0010 EXC=000824\r\n";

    #[test]
    fn decodes_sample_line() {
        let decoded = decode_line(SAMPLE).unwrap();
        let reading = &decoded.reading;

        assert_eq!(reading.device_timestamp, "05/20/21 14:06:02");
        assert_eq!(reading.serial_number.as_deref(), Some("0000182948"));
        assert_eq!(reading.spo2.as_deref(), Some("098"));
        assert_eq!(reading.bpm.as_deref(), Some("101"));
        assert_eq!(reading.pi, None);
        assert_eq!(reading.spco, None);
        assert_eq!(reading.spmet, None);
        assert_eq!(reading.desat, None);
        assert_eq!(reading.pi_delta, None);
        assert_eq!(reading.alarm.as_deref(), Some("0010"));
        assert_eq!(reading.exception.as_deref(), Some("000824"));

        assert_eq!(
            decoded.exceptions.0,
            vec![
                DeviceException::LowPerfusion,
                DeviceException::SensorLight,
                DeviceException::MasimoSet
            ]
        );
        assert!(!decoded.alarms.silenced());
        for bit in AlarmBit::ALL {
            assert!(!decoded.alarms.asserts(bit));
        }
    }

    #[test]
    fn cleans_units_and_placeholders() {
        assert_eq!(clean_value("098%"), "098");
        assert_eq!(clean_value("--.--%"), "");
        assert_eq!(clean_value("--.-%"), "");
        assert_eq!(clean_value("+--"), "");
        assert_eq!(clean_value("+1.5"), "1.5");
        assert_eq!(clean_value("2.41%"), "2.41");
    }

    #[test]
    fn live_values_are_kept() {
        let line = "05/20/21 14:07:00 SN=1 SPO2=089% BPM=052 PI=2.41% SPCO=--.-% SPMET=1.2% DESAT=03 PIDELTA=+12 ALARM=002A EXC=000000";
        let decoded = decode_line(line).unwrap();

        assert_eq!(decoded.reading.spo2_percent(), Some(89));
        assert_eq!(decoded.reading.pulse_rate(), Some(52));
        assert_eq!(decoded.reading.spmet.as_deref(), Some("1.2"));
        assert_eq!(decoded.reading.pi_delta.as_deref(), Some("12"));
        assert!(decoded.exceptions.is_normal());

        // 0x2A = 101010: silenced, Low Heart Rate, Low O2 -> collapses to Sensor Off
        assert_eq!(decoded.alarms, AlarmMask::SENSOR_OFF);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let line = "05/20/21 14:07:00 FOO=bar ALARM=0000 EXC=000000";
        assert!(decode_line(line).is_ok());
    }

    #[test]
    fn short_line_is_truncated() {
        assert_eq!(
            decode_line("05/20/21\r\n"),
            Err(DecodeError::Truncated("05/20/21".into()))
        );
        assert!(matches!(decode_line(""), Err(DecodeError::Truncated(_))));
    }

    #[test]
    fn token_without_equals_is_malformed() {
        let line = "05/20/21 14:07:00 SPO2=098% garbage ALARM=0000 EXC=000000";
        assert_eq!(
            decode_line(line),
            Err(DecodeError::MalformedToken("garbage".into()))
        );
    }

    #[test]
    fn missing_bitmask_fields() {
        let line = "05/20/21 14:07:00 SPO2=098% ALARM=0000";
        assert_eq!(
            decode_line(line),
            Err(DecodeError::Bitmask(BitmaskError::Missing("EXC")))
        );

        let line = "05/20/21 14:07:00 SPO2=098% EXC=000000";
        assert_eq!(
            decode_line(line),
            Err(DecodeError::Bitmask(BitmaskError::Missing("ALARM")))
        );

        // A placeholder counts as missing
        let line = "05/20/21 14:07:00 ALARM=---- EXC=000000";
        assert_eq!(
            decode_line(line),
            Err(DecodeError::Bitmask(BitmaskError::Missing("ALARM")))
        );
    }

    #[test]
    fn non_hex_bitmask_is_rejected() {
        let line = "05/20/21 14:07:00 ALARM=00ZZ EXC=000000";
        assert!(matches!(
            decode_line(line),
            Err(DecodeError::Bitmask(BitmaskError::NotHex { field: "ALARM", .. }))
        ));
    }
}
