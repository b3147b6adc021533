//! On-disk alarm history.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rad8_types::HistoryEntry;

use crate::error::PersistenceError;

/// A JSON file holding the resolved-alarm history, newest first.
///
/// The file is rewritten in full on every save. Writes go to a sibling
/// `.tmp` file which is then renamed over the live file, so a crash mid-write
/// leaves the previous history intact.
#[derive(Debug, Clone)]
pub struct HistoryFile {
    path: PathBuf,
}

impl HistoryFile {
    /// Create a history file handle for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the path of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored history.
    ///
    /// A file that does not exist yet is an empty history, not an error.
    pub fn load(&self) -> Result<Vec<HistoryEntry>, PersistenceError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| PersistenceError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the stored history.
    pub fn save(&self, entries: &[HistoryEntry]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string(entries).map_err(PersistenceError::Serialize)?;

        let tmp = self.temp_path();
        fs::write(&tmp, json).map_err(|source| PersistenceError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rad8_types::{ActiveAlarm, AlarmBit};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn entry(bit: AlarmBit, n: u32) -> HistoryEntry {
        ActiveAlarm::new(bit, false, format!("start-{}", n), "dev").resolve(format!("end-{}", n), "dev")
    }

    #[test]
    fn missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let file = HistoryFile::new(dir.path().join("alarm_history.json"));

        assert!(file.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let file = HistoryFile::new(dir.path().join("alarm_history.json"));
        let entries = vec![entry(AlarmBit::LowO2, 2), entry(AlarmBit::LowHeartRate, 1)];

        file.save(&entries).unwrap();
        assert_eq!(file.load().unwrap(), entries);

        // Overwritten in full, no temp file left behind
        file.save(&entries[..1]).unwrap();
        assert_eq!(file.load().unwrap(), entries[..1].to_vec());
        assert!(!dir.path().join("alarm_history.json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_parse_error() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "not valid json").unwrap();

        let file = HistoryFile::new(tmp.path());
        let err = file.load().unwrap_err();
        assert!(matches!(err, PersistenceError::Parse { .. }));
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn unwritable_location_is_write_error() {
        let file = HistoryFile::new("/nonexistent/dir/alarm_history.json");
        let err = file.save(&[entry(AlarmBit::LowO2, 1)]).unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }

    #[test]
    fn loads_history_written_by_older_bridge() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(
            tmp,
            r#"[{{"bit": 4, "alarm_text": "Low O2", "silenced": "0",
                "start_interface_timestamp": "05/20/21 14:06:02",
                "start_rad8_timestamp": "05/20/21 14:06:01",
                "end_interface_timestamp": "05/20/21 14:07:02",
                "end_rad8_timestamp": "05/20/21 14:07:01"}}]"#
        )
        .unwrap();

        let entries = HistoryFile::new(tmp.path()).load().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].bit, AlarmBit::LowO2);
        assert!(!entries[0].silenced);
    }
}
