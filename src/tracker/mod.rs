//! Alarm lifecycle tracking.
//!
//! Each cycle the tracker receives the decoded alarm mask and walks the
//! tracked conditions in ascending code order. Per condition there are two
//! states, inactive (no record) and active (one open [`ActiveAlarm`]):
//!
//! ```text
//!             asserted                      still asserted
//!  Inactive ─────────────▶ Active ◀──────────────────────┐
//!     ▲                     │  └──────── refresh silenced ┘
//!     └──── cleared ────────┘
//!        (record moves to history, history persisted)
//! ```

mod history;

pub use history::HistoryFile;

use std::collections::{BTreeMap, VecDeque};

use rad8_types::{ActiveAlarm, AlarmBit, HistoryEntry};
use tracing::{error, info, warn};

use crate::decode::AlarmMask;

/// Default number of resolved alarms kept in history.
pub const DEFAULT_HISTORY_CAPACITY: usize = 40;

/// A state change produced by one call to [`AlarmTracker::process`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEvent {
    /// The condition became active.
    Raised(AlarmBit),
    /// The silence flag of an active alarm flipped.
    SilenceChanged { bit: AlarmBit, silenced: bool },
    /// The condition cleared and its record moved to history.
    Resolved(AlarmBit),
}

/// Tracks active alarms and the bounded history of resolved ones.
///
/// The tracker owns alarm state exclusively; at most one active record
/// exists per [`AlarmBit`].
#[derive(Debug)]
pub struct AlarmTracker {
    active: BTreeMap<AlarmBit, ActiveAlarm>,
    /// Newest first.
    history: VecDeque<HistoryEntry>,
    capacity: usize,
    store: Option<HistoryFile>,
}

impl AlarmTracker {
    /// Create a tracker, loading any history already on disk.
    ///
    /// A history that cannot be read is logged and replaced by an empty one.
    pub fn new(store: Option<HistoryFile>, capacity: usize) -> Self {
        let mut history = VecDeque::new();

        if let Some(file) = &store {
            match file.load() {
                Ok(entries) => {
                    info!(
                        "Loaded {} alarm history entries from {}",
                        entries.len(),
                        file.path().display()
                    );
                    history.extend(entries);
                }
                Err(e) => error!("Starting with empty alarm history: {}", e),
            }
        }

        let mut tracker = Self {
            active: BTreeMap::new(),
            history,
            capacity,
            store,
        };
        tracker.evict_overflow();
        tracker
    }

    /// Create a tracker that keeps history in memory only.
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(None, capacity)
    }

    /// Apply one cycle's alarm mask.
    ///
    /// `interface_timestamp` and `device_timestamp` stamp any alarm that
    /// starts or ends this cycle.
    pub async fn process(
        &mut self,
        mask: AlarmMask,
        interface_timestamp: &str,
        device_timestamp: &str,
    ) -> Vec<AlarmEvent> {
        let silenced = mask.silenced();
        let mut events = Vec::new();

        for bit in AlarmBit::ALL {
            if mask.asserts(bit) {
                match self.active.get_mut(&bit) {
                    Some(alarm) => {
                        if alarm.silenced != silenced {
                            alarm.silenced = silenced;
                            events.push(AlarmEvent::SilenceChanged { bit, silenced });
                        }
                    }
                    None => {
                        self.active.insert(
                            bit,
                            ActiveAlarm::new(bit, silenced, interface_timestamp, device_timestamp),
                        );
                        events.push(AlarmEvent::Raised(bit));
                    }
                }
            } else if let Some(mut alarm) = self.active.remove(&bit) {
                alarm.silenced = silenced;
                self.history
                    .push_front(alarm.resolve(interface_timestamp, device_timestamp));
                events.push(AlarmEvent::Resolved(bit));
            }
        }

        if events.iter().any(|e| matches!(e, AlarmEvent::Resolved(_))) {
            self.evict_overflow();
            self.persist().await;
        }

        events
    }

    /// Active alarms in ascending bit order.
    pub fn active_alarms(&self) -> Vec<ActiveAlarm> {
        self.active.values().cloned().collect()
    }

    /// Resolved alarms, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.iter().cloned().collect()
    }

    /// Whether the given condition is currently active.
    pub fn is_active(&self, bit: AlarmBit) -> bool {
        self.active.contains_key(&bit)
    }

    /// Maximum number of history entries kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn evict_overflow(&mut self) {
        while self.history.len() > self.capacity {
            if let Some(oldest) = self.history.pop_back() {
                info!(
                    "Evicting oldest alarm from history: {} ({} - {})",
                    oldest.alarm_text, oldest.start_interface_timestamp, oldest.end_interface_timestamp
                );
            }
        }
    }

    /// Saves run on the blocking pool. Each one is awaited, so writes land in
    /// resolution order.
    async fn persist(&self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let entries: Vec<HistoryEntry> = self.history.iter().cloned().collect();

        match tokio::task::spawn_blocking(move || store.save(&entries)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Alarm history kept in memory only: {}", e),
            Err(e) => error!("Alarm history save task failed: {}", e),
        }
    }
}
