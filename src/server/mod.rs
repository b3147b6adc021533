//! WebSocket feed for snapshot consumers.
//!
//! Every accepted client gets its own [`Connection`] task. Clients never talk
//! to each other or to the poller; they only read the shared
//! [`SnapshotStore`].

mod connection;

pub use connection::{Connection, ConnectionId, SnapshotSink};

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rad8_types::Snapshot;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::store::SnapshotStore;

/// Port the feed listens on when none is configured.
pub const DEFAULT_PORT: u16 = 5678;

/// Pause after a failed accept. Errors like EMFILE persist until some socket
/// closes, so retrying at once would spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// How often each client is sent a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Interval while the device is producing data.
    pub live: Duration,
    /// Interval while it is not.
    pub idle: Duration,
}

impl Cadence {
    pub fn new(live: Duration, idle: Duration) -> Self {
        Self { live, idle }
    }

    /// Delay to wait after sending `snapshot`.
    pub fn delay_for(&self, snapshot: &Snapshot) -> Duration {
        if snapshot.data_received {
            self.live
        } else {
            self.idle
        }
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            live: Duration::from_secs(4),
            idle: Duration::from_secs(15),
        }
    }
}

/// Accepts feed clients and spawns a push loop for each.
#[derive(Debug)]
pub struct BroadcastServer {
    listener: TcpListener,
    store: Arc<SnapshotStore>,
    cadence: Cadence,
    next_seq: AtomicU64,
}

impl BroadcastServer {
    /// Bind the listening socket.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<SnapshotStore>,
        cadence: Cadence,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            cadence,
            next_seq: AtomicU64::new(1),
        })
    }

    /// The address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept clients until `shutdown` flips to `true`.
    ///
    /// Connections already running are not cancelled here; they end on their
    /// own once the store is closed.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        match self.listener.local_addr() {
            Ok(addr) => info!("Starting websocket server on {}", addr),
            Err(e) => warn!("Starting websocket server on unknown address: {}", e),
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => accept_backoff(&e).await,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Websocket server stopped accepting connections");
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr) {
        let id = ConnectionId::new(peer.ip(), self.next_seq.fetch_add(1, Ordering::Relaxed));
        let store = self.store.clone();
        let cadence = self.cadence;

        tokio::spawn(async move {
            match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => Connection::new(id, ws, store, cadence).run().await,
                Err(e) => warn!("{} websocket handshake failed: {}", id, e),
            }
        });
    }
}

async fn accept_backoff(e: &std::io::Error) {
    warn!("Failed to accept connection: {}", e);
    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
}
