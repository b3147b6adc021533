//! Shared holder for the latest published snapshot.

use std::sync::Arc;

use parking_lot::RwLock;
use rad8_types::Snapshot;

/// Single-writer, multi-reader holder of the latest [`Snapshot`].
///
/// The poller replaces the snapshot wholesale once per cycle; connections
/// read it at their own pace. Each read hands out an `Arc` to an immutable
/// snapshot, so a reader either sees the previous cycle or the new one in
/// full. The lock is only held for the pointer swap or clone.
///
/// # Example
///
/// ```rust
/// use rad8_bridge::SnapshotStore;
/// use rad8_types::Snapshot;
///
/// let store = SnapshotStore::new(Snapshot::builder("05/20/21 14:06:02").build());
/// store.publish(Snapshot::builder("05/20/21 14:06:03").transport_connected(true).build());
///
/// let latest = store.read().unwrap();
/// assert!(latest.transport_connected);
/// ```
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    /// Create a store holding an initial snapshot.
    pub fn new(initial: Snapshot) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(initial))),
        }
    }

    /// Replace the stored snapshot and return the shared copy.
    ///
    /// Publishing after [`close`](Self::close) is ignored.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write();
        if current.is_some() {
            *current = Some(snapshot.clone());
        }
        snapshot
    }

    /// The latest snapshot, or `None` once the store has been closed.
    pub fn read(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    /// Close the store. Readers stop at their next read.
    pub fn close(&self) {
        self.current.write().take();
    }

    /// Whether the store has been closed.
    pub fn is_closed(&self) -> bool {
        self.current.read().is_none()
    }
}
