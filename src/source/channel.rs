//! Channel-based line source.
//!
//! Receives device lines via a tokio mpsc channel. Useful when lines are
//! pushed by another component rather than read from a port, and in tests.

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::LineSource;
use crate::error::TransportError;

/// Buffer size for channels built by [`ChannelSource::create`].
const CHANNEL_CAPACITY: usize = 64;

/// A line source fed through a channel.
///
/// Reads never wait: a cycle with nothing queued yields `Ok(None)`. Once every
/// sender is dropped the source reports [`TransportError::Closed`] and cannot
/// be reopened.
///
/// # Example
///
/// ```
/// use rad8_bridge::ChannelSource;
///
/// // Create a channel pair
/// let (tx, source) = ChannelSource::create("bench rig");
/// ```
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<String>,
    description: String,
    open: bool,
    disconnected: bool,
}

impl ChannelSource {
    /// Create a new channel source.
    ///
    /// # Arguments
    ///
    /// * `receiver` - The receiving end of an mpsc channel
    /// * `source_description` - Where the lines come from
    pub fn new(receiver: mpsc::Receiver<String>, source_description: &str) -> Self {
        Self {
            receiver,
            description: format!("channel: {}", source_description),
            open: false,
            disconnected: false,
        }
    }

    /// Create a channel pair for pushing lines into a `ChannelSource`.
    pub fn create(source_description: &str) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (tx, Self::new(rx, source_description))
    }
}

#[async_trait]
impl LineSource for ChannelSource {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        if self.disconnected {
            return Err(TransportError::Closed);
        }
        self.open = true;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }

        match self.receiver.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.disconnected = true;
                Err(TransportError::Closed)
            }
        }
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn description(&self) -> &str {
        &self.description
    }
}
