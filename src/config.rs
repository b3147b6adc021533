//! Bridge configuration.
//!
//! Settings come from an optional TOML file layered with `RAD8_*` environment
//! variables. Nested keys use a double underscore, so
//! `RAD8_BROADCAST__LISTEN=127.0.0.1:9000` overrides `broadcast.listen`.
//! Every key has a default, and an empty configuration runs the bridge against
//! `/dev/ttyUSB0` with the feed on port 5678.
//!
//! ```toml
//! [device]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//!
//! [broadcast]
//! listen = "0.0.0.0:5678"
//! live_interval_secs = 4
//! idle_interval_secs = 15
//!
//! [history]
//! path = "alarm_history.json"
//! capacity = 40
//!
//! [logging]
//! level = "info"
//! file = "RAD8.log"
//! ```

use std::net::{AddrParseError, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::server::{Cadence, DEFAULT_PORT};
use crate::source::{DEFAULT_BAUD_RATE, DEFAULT_DEVICE};
use crate::tracker::DEFAULT_HISTORY_CAPACITY;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "RAD8";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub device: DeviceConfig,
    pub poll: PollConfig,
    pub broadcast: BroadcastConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::from_sources(path, environment())
    }

    fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder.add_source(env).build().with_context(|| match path {
            Some(path) => format!("Failed to read config from {}", path.display()),
            None => "Failed to read config from environment".to_string(),
        })?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Serial device settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl DeviceConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub period_ms: u64,
}

impl PollConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { period_ms: 1000 }
    }
}

/// Websocket feed settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Address the feed listens on.
    pub listen: String,
    pub live_interval_secs: u64,
    pub idle_interval_secs: u64,
}

impl BroadcastConfig {
    pub fn listen_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.listen.parse()
    }

    pub fn cadence(&self) -> Cadence {
        Cadence::new(
            Duration::from_secs(self.live_interval_secs),
            Duration::from_secs(self.idle_interval_secs),
        )
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            listen: format!("0.0.0.0:{}", DEFAULT_PORT),
            live_interval_secs: 4,
            idle_interval_secs: 15,
        }
    }
}

/// Alarm history persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("alarm_history.json"),
            capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `rad8_bridge=debug`.
    pub level: String,
    /// Log file appended to alongside stderr. Empty disables it.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// The log file, if one is configured.
    pub fn file_path(&self) -> Option<&Path> {
        self.file
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("RAD8.log")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: config::Map<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        environment().source(Some(map))
    }

    fn toml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn empty_sources_give_defaults() {
        let config = AppConfig::from_sources(None, env(&[])).unwrap();
        assert_eq!(config, AppConfig::default());

        assert_eq!(config.device.port, "/dev/ttyUSB0");
        assert_eq!(config.device.baud_rate, 9600);
        assert_eq!(config.poll.period(), Duration::from_secs(1));
        assert_eq!(config.broadcast.listen_addr().unwrap().port(), 5678);
        assert_eq!(config.broadcast.cadence(), Cadence::default());
        assert_eq!(config.history.capacity, 40);
        assert_eq!(config.logging.file_path(), Some(Path::new("RAD8.log")));
    }

    #[test]
    fn file_overrides_defaults() {
        let file = toml_file(
            r#"
            [device]
            port = "/dev/ttyS3"

            [history]
            path = "/var/lib/rad8/history.json"
            capacity = 10

            [logging]
            file = ""
            "#,
        );

        let config = AppConfig::from_sources(Some(file.path()), env(&[])).unwrap();
        assert_eq!(config.device.port, "/dev/ttyS3");
        // Untouched keys keep their defaults
        assert_eq!(config.device.baud_rate, 9600);
        assert_eq!(config.history.capacity, 10);
        assert_eq!(config.history.path, PathBuf::from("/var/lib/rad8/history.json"));
        assert_eq!(config.logging.file_path(), None);
    }

    #[test]
    fn environment_overrides_file() {
        let file = toml_file("[broadcast]\nlisten = \"0.0.0.0:9000\"\n");
        let config = AppConfig::from_sources(
            Some(file.path()),
            env(&[
                ("RAD8_BROADCAST__LISTEN", "127.0.0.1:9100"),
                ("RAD8_BROADCAST__IDLE_INTERVAL_SECS", "30"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config.broadcast.listen_addr().unwrap(),
            "127.0.0.1:9100".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(config.broadcast.cadence().idle, Duration::from_secs(30));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = AppConfig::from_sources(Some(Path::new("/nonexistent/rad8.toml")), env(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn wrong_type_is_an_error() {
        let file = toml_file("[history]\ncapacity = \"lots\"\n");
        assert!(AppConfig::from_sources(Some(file.path()), env(&[])).is_err());
    }
}
