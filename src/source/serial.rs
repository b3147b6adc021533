//! Serial port line source.
//!
//! Talks to the RAD-8 over its RS-232 output (9600 baud, 8N1). The port is
//! read through blocking calls, so every read runs on the blocking pool.

use std::fmt;
use std::io::{self, Read};
use std::time::Duration;

use async_trait::async_trait;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use super::LineSource;
use crate::error::TransportError;

/// Device path used when none is configured.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Baud rate of the RAD-8 serial output.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Longest line accepted before the read gives up on finding a terminator.
const MAX_LINE_LEN: usize = 1024;

/// A line source backed by a serial port.
///
/// Each read discards whatever is buffered on the port and then waits for the
/// next complete line, so the poller always sees the device's latest output
/// rather than a backlog.
pub struct SerialSource {
    device: String,
    baud_rate: u32,
    timeout: Duration,
    description: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialSource {
    /// Create a closed source for `device`.
    pub fn new(device: impl Into<String>, baud_rate: u32, timeout: Duration) -> Self {
        let device = device.into();
        let description = format!("serial: {} @ {}", device, baud_rate);
        Self {
            device,
            baud_rate,
            timeout,
            description,
            port: None,
        }
    }

    /// Path of the serial device.
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialSource")
            .field("device", &self.device)
            .field("baud_rate", &self.baud_rate)
            .field("timeout", &self.timeout)
            .field("open", &self.port.is_some())
            .finish()
    }
}

#[async_trait]
impl LineSource for SerialSource {
    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        self.port = None;

        let port = serialport::new(&self.device, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()
            .map_err(|e| TransportError::Open {
                device: self.device.clone(),
                reason: e.to_string(),
            })?;

        info!("Opened serial port {} at {} baud", self.device, self.baud_rate);
        self.port = Some(port);
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut port = self.port.take().ok_or(TransportError::NotOpen)?;

        let joined = tokio::task::spawn_blocking(move || {
            let result = read_fresh_line(port.as_mut());
            (port, result)
        })
        .await;

        let (port, result) = joined.map_err(|e| TransportError::Read {
            device: self.device.clone(),
            source: io::Error::new(io::ErrorKind::Other, e),
        })?;

        match result {
            Ok(line) => {
                self.port = Some(port);
                Ok(line)
            }
            // The port is dropped here, leaving the source closed
            Err(source) => Err(TransportError::Read {
                device: self.device.clone(),
                source,
            }),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.device);
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Flush the input buffer, then read up to and including the next `\n`.
///
/// A read timeout ends the line early; an empty result means the device sent
/// nothing within the timeout.
fn read_fresh_line(port: &mut dyn SerialPort) -> io::Result<Option<String>> {
    port.clear(ClearBuffer::Input)?;
    read_until_newline(port)
}

fn read_until_newline<R: Read + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    let mut line = Vec::with_capacity(128);
    let mut byte = [0u8; 1];

    while line.len() < MAX_LINE_LEN {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Yields its data, then times out like an idle port.
    struct TimingOut(Cursor<Vec<u8>>);

    impl Read for TimingOut {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.read(buf)? {
                0 => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
                n => Ok(n),
            }
        }
    }

    #[test]
    fn reads_one_line_at_a_time() {
        let mut reader = Cursor::new(b"first\r\nsecond\r\n".to_vec());
        assert_eq!(
            read_until_newline(&mut reader).unwrap().as_deref(),
            Some("first\r\n")
        );
        assert_eq!(
            read_until_newline(&mut reader).unwrap().as_deref(),
            Some("second\r\n")
        );
        assert_eq!(read_until_newline(&mut reader).unwrap(), None);
    }

    #[test]
    fn timeout_returns_partial_line() {
        let mut reader = TimingOut(Cursor::new(b"05/20/21 14:06".to_vec()));
        assert_eq!(
            read_until_newline(&mut reader).unwrap().as_deref(),
            Some("05/20/21 14:06")
        );
        assert_eq!(read_until_newline(&mut reader).unwrap(), None);
    }

    #[test]
    fn unterminated_input_is_capped() {
        let mut reader = Cursor::new(vec![b'A'; MAX_LINE_LEN * 2]);
        let line = read_until_newline(&mut reader).unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN);
    }

    #[tokio::test]
    async fn missing_device_fails_to_open() {
        let mut source = SerialSource::new(
            "/dev/rad8-bridge-does-not-exist",
            DEFAULT_BAUD_RATE,
            Duration::from_secs(1),
        );

        let err = source.open().await.unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(!source.is_open());
        assert!(matches!(
            source.read_line().await,
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn description_names_device() {
        let source = SerialSource::new(DEFAULT_DEVICE, DEFAULT_BAUD_RATE, Duration::from_secs(1));
        assert_eq!(source.description(), "serial: /dev/ttyUSB0 @ 9600");
        assert_eq!(source.device(), DEFAULT_DEVICE);
    }
}
