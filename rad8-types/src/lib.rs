//! # rad8-types
//!
//! Schema types for the RAD-8 pulse oximeter feed. This crate defines the
//! records the bridge produces from the device's serial output and pushes to
//! monitoring clients: decoded readings, exception conditions, alarm
//! lifecycle records and the per-cycle snapshot that ties them together.
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON serialization via serde, using the field names of the
//!   legacy RAD-8 websocket feed so existing dashboards keep working
//!
//! ## Example
//!
//! ```rust
//! use rad8_types::{ActiveAlarm, AlarmBit, Reading, Snapshot};
//!
//! let reading = Reading::new("05/20/21 14:06:02");
//! let alarm = ActiveAlarm::new(AlarmBit::LowO2, false, "05/20/21 14:06:03", "05/20/21 14:06:02");
//!
//! let snapshot = Snapshot::builder("05/20/21 14:06:03")
//!     .transport_connected(true)
//!     .reading(reading)
//!     .active_alarms(vec![alarm])
//!     .build();
//!
//! assert!(snapshot.data_received);
//! assert_eq!(snapshot.active_alarms.len(), 1);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod alarm;
mod exception;
mod reading;
mod snapshot;

pub use alarm::*;
pub use exception::*;
pub use reading::*;
pub use snapshot::*;

