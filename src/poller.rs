//! The fixed-period device poll loop.
//!
//! Each cycle reads at most one line from the transport, decodes it, feeds
//! the alarm tracker and publishes a fresh snapshot. Nothing that goes wrong
//! inside a cycle stops the loop.

use std::sync::Arc;
use std::time::Duration;

use rad8_types::Snapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::decode::decode_line;
use crate::source::LineSource;
use crate::store::SnapshotStore;
use crate::tracker::{AlarmEvent, AlarmTracker};

/// Default time between poll cycles.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(1);

/// Format of the bridge clock in snapshots, matching the device's own.
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%y %H:%M:%S";

/// Current local time as an interface timestamp.
pub fn interface_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Drives the transport, decoder and tracker once per period.
///
/// The poller is the only writer of the [`SnapshotStore`] and the only owner
/// of the [`AlarmTracker`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use rad8_bridge::{AlarmTracker, ChannelSource, DevicePoller, SnapshotStore};
/// use rad8_types::Snapshot;
///
/// # tokio_test::block_on(async {
/// let (tx, source) = ChannelSource::create("bench");
/// let store = Arc::new(SnapshotStore::new(Snapshot::builder("").build()));
/// let tracker = AlarmTracker::in_memory(40);
///
/// let mut poller = DevicePoller::new(source, tracker, store.clone(), Duration::from_secs(1));
///
/// // First cycle opens the source
/// let snapshot = poller.poll_once().await;
/// assert!(!snapshot.transport_connected);
///
/// tx.send("05/20/21 14:06:02 SPO2=098% ALARM=0000 EXC=000000".into()).await.unwrap();
/// let snapshot = poller.poll_once().await;
/// assert!(snapshot.data_received);
/// # });
/// ```
#[derive(Debug)]
pub struct DevicePoller {
    source: Box<dyn LineSource>,
    tracker: AlarmTracker,
    store: Arc<SnapshotStore>,
    period: Duration,
}

impl DevicePoller {
    pub fn new(
        source: impl LineSource + 'static,
        tracker: AlarmTracker,
        store: Arc<SnapshotStore>,
        period: Duration,
    ) -> Self {
        Self {
            source: Box::new(source),
            tracker,
            store,
            period,
        }
    }

    /// Time between cycles.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// The alarm tracker driven by this poller.
    pub fn tracker(&self) -> &AlarmTracker {
        &self.tracker
    }

    /// Run one cycle stamped with the current local time.
    pub async fn poll_once(&mut self) -> Arc<Snapshot> {
        self.cycle(interface_timestamp()).await
    }

    async fn cycle(&mut self, interface_timestamp: String) -> Arc<Snapshot> {
        let connected = self.source.is_open();
        let line = if connected {
            self.read_line().await
        } else {
            self.reopen().await;
            None
        };

        let mut builder = Snapshot::builder(interface_timestamp.as_str()).transport_connected(connected);

        if let Some(line) = line {
            match decode_line(&line) {
                Ok(decoded) => {
                    let events = self
                        .tracker
                        .process(
                            decoded.alarms,
                            &interface_timestamp,
                            &decoded.reading.device_timestamp,
                        )
                        .await;
                    log_events(&events);
                    builder = builder
                        .reading(decoded.reading)
                        .exceptions(decoded.exceptions);
                }
                Err(e) => warn!("Discarding device line: {}", e),
            }
        }

        let snapshot = builder
            .active_alarms(self.tracker.active_alarms())
            .history(self.tracker.history())
            .build();

        debug!(
            "Cycle {}: serial_conn={} serial_data={} active_alarms={}",
            snapshot.interface_timestamp,
            snapshot.transport_connected,
            snapshot.data_received,
            snapshot.active_alarms.len()
        );

        self.store.publish(snapshot)
    }

    async fn read_line(&mut self) -> Option<String> {
        match self.source.read_line().await {
            Ok(line) => line,
            Err(e) => {
                warn!("Lost {}: {}", self.source.description(), e);
                self.source.close();
                None
            }
        }
    }

    async fn reopen(&mut self) {
        match self.source.open().await {
            Ok(()) => info!("Connected to {}", self.source.description()),
            Err(e) => warn!("Cannot open {}: {}", self.source.description(), e),
        }
    }

    /// Spawn the poll loop on the current runtime.
    ///
    /// The first cycle runs immediately. If a cycle overruns the period the
    /// next one is delayed rather than bunched up.
    pub fn start(mut self) -> PollerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(self.period);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        self.poll_once().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            self.source.close();
            info!("Device poller stopped");
        });

        PollerHandle { stop_tx, task }
    }
}

fn log_events(events: &[AlarmEvent]) {
    for event in events {
        match event {
            AlarmEvent::Raised(bit) => info!("Alarm raised: {}", bit),
            AlarmEvent::SilenceChanged { bit, silenced: true } => info!("Alarm silenced: {}", bit),
            AlarmEvent::SilenceChanged { bit, silenced: false } => {
                info!("Alarm unsilenced: {}", bit)
            }
            AlarmEvent::Resolved(bit) => info!("Alarm resolved: {}", bit),
        }
    }
}

/// Handle for controlling a running poller.
///
/// Dropping the handle also stops the loop at its next wakeup.
#[derive(Debug)]
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop the poll loop and wait for the in-flight cycle to finish.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.task.await {
            warn!("Device poller task failed: {}", e);
        }
    }

    /// Whether the poll loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
