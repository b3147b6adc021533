//! Replay a captured device log.
//!
//! Lets the bridge run without hardware. The capture is a plain text file of
//! device lines, as written by a serial terminal or `cat /dev/ttyUSB0`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::LineSource;
use crate::error::TransportError;

/// A line source that replays a capture file in a loop.
///
/// The file is read once on [`open`](LineSource::open). Blank lines are
/// skipped. After the last line the replay starts over, so the feed keeps
/// running for as long as the bridge does.
#[derive(Debug)]
pub struct ReplaySource {
    path: PathBuf,
    description: String,
    lines: Vec<String>,
    cursor: usize,
    open: bool,
}

impl ReplaySource {
    /// Create a closed source for the given capture file.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("replay: {}", path.display());
        Self {
            path,
            description,
            lines: Vec::new(),
            cursor: 0,
            open: false,
        }
    }

    /// Returns the capture file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines loaded from the capture.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[async_trait]
impl LineSource for ReplaySource {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        let content =
            tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| TransportError::Open {
                    device: self.path.display().to_string(),
                    reason: e.to_string(),
                })?;

        self.lines = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect();
        self.cursor = 0;
        self.open = true;

        info!("Replaying {} lines from {}", self.lines.len(), self.path.display());
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        if self.lines.is_empty() {
            return Ok(None);
        }

        let line = self.lines[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.lines.len();
        Ok(Some(line))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn description(&self) -> &str {
        &self.description
    }
}
