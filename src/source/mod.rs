//! Line source abstraction for the device transport.
//!
//! The poller does not care where device lines come from. A physical serial
//! port, a captured log file, or an in-process channel all look the same
//! behind [`LineSource`].

mod channel;
mod replay;
mod serial;

pub use channel::ChannelSource;
pub use replay::ReplaySource;
pub use serial::{SerialSource, DEFAULT_BAUD_RATE, DEFAULT_DEVICE};

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::TransportError;

/// Trait for producing raw device lines.
///
/// A source is either open or closed. The poller reads at most one line per
/// cycle from an open source and tries to reopen a closed one.
///
/// # Example
///
/// ```
/// use rad8_bridge::{ChannelSource, LineSource};
///
/// # tokio_test::block_on(async {
/// let (tx, mut source) = ChannelSource::create("bench");
/// source.open().await.unwrap();
///
/// tx.send("05/20/21 14:06:02 ALARM=0000 EXC=000000".to_string()).await.unwrap();
/// let line = source.read_line().await.unwrap();
/// assert!(line.is_some());
/// # });
/// ```
#[async_trait]
pub trait LineSource: Send + Debug {
    /// Whether the source is currently open.
    fn is_open(&self) -> bool;

    /// Open (or reopen) the source.
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Read the freshest available line.
    ///
    /// Returns `Ok(None)` when no line arrived in time. An error means the
    /// source is no longer usable and should be closed.
    async fn read_line(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the source. Closing a closed source does nothing.
    fn close(&mut self);

    /// Returns a human-readable description of the source.
    ///
    /// Used in log lines.
    fn description(&self) -> &str;
}

#[async_trait]
impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        (**self).open().await
    }

    async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        (**self).read_line().await
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn description(&self) -> &str {
        (**self).description()
    }
}
