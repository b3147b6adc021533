//! # rad8-bridge
//!
//! Bridges a Masimo RAD-8 pulse oximeter's serial output to a live WebSocket
//! feed.
//!
//! The device prints one line of vitals per second. The bridge decodes each
//! line, follows the lifecycle of the alarms it reports, keeps a bounded
//! history of resolved alarms on disk, and pushes the latest state to every
//! connected client.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          DevicePoller                            │
//! │  ┌─────────┐    ┌──────────┐    ┌──────────┐    ┌─────────────┐  │
//! │  │ source  │───▶│  decode  │───▶│ tracker  │───▶│    store    │  │
//! │  │ (lines) │    │ (parse)  │    │ (alarms) │    │ (snapshot)  │  │
//! │  └─────────┘    └──────────┘    └────┬─────┘    └──────┬──────┘  │
//! │       ▲                              │                 │         │
//! │  Serial | Replay | Channel     alarm_history.json      │         │
//! └────────────────────────────────────────────────────────┼─────────┘
//!                                                          ▼
//!                                           ┌────────────────────────┐
//!                                           │        server          │
//!                                           │ Connection per client  │
//!                                           └────────────────────────┘
//! ```
//!
//! - **[`source`]**: Line source abstraction ([`LineSource`] trait) with
//!   implementations for a serial port, a replayed capture and a channel
//! - **[`decode`]**: Pure decoding of one device line into a [`Reading`],
//!   the exception list and the alarm mask
//! - **[`tracker`]**: Alarm lifecycle state machine and persisted history
//! - **[`store`]**: Shared holder for the latest [`Snapshot`]
//! - **[`poller`]**: The fixed-period cycle tying the above together
//! - **[`server`]**: WebSocket accept loop and per-client push loops
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Read the oximeter on the default port, serve the feed on :5678
//! rad8-bridge
//!
//! # Replay a captured log instead of reading hardware
//! rad8-bridge --replay capture.log --listen 127.0.0.1:5678
//! ```
//!
//! ### As a library
//!
//! ```
//! use rad8_bridge::decode_line;
//! use rad8_types::DeviceException;
//!
//! let line = "05/20/21 14:06:02 SN=0000182948 SPO2=098% BPM=101 PI=--.--% \
//!             SPCO=--.-% SPMET=--.-% DESAT=-- PIDELTA=+-- ALARM=0010 EXC=000824";
//! let decoded = decode_line(line).unwrap();
//!
//! assert_eq!(decoded.reading.spo2_percent(), Some(98));
//! assert!(decoded.exceptions.contains(DeviceException::LowPerfusion));
//! ```
//!
//! [`Reading`]: rad8_types::Reading
//! [`Snapshot`]: rad8_types::Snapshot

pub mod config;
pub mod decode;
pub mod error;
pub mod logging;
pub mod poller;
pub mod server;
pub mod source;
pub mod store;
pub mod tracker;

pub use config::AppConfig;
pub use decode::{decode_line, AlarmMask, Decoded};
pub use error::{BitmaskError, DecodeError, PersistenceError, SendError, TransportError};
pub use poller::{DevicePoller, PollerHandle};
pub use server::{BroadcastServer, Cadence, Connection, ConnectionId, SnapshotSink};
pub use source::{ChannelSource, LineSource, ReplaySource, SerialSource};
pub use store::SnapshotStore;
pub use tracker::{AlarmEvent, AlarmTracker, HistoryFile};
