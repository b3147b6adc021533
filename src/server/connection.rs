//! One feed client and its push loop.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, trace, warn};

use super::Cadence;
use crate::error::SendError;
use crate::store::SnapshotStore;

/// Identifies a client in log lines as `[client:<ip>/<seq>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    pub addr: IpAddr,
    pub seq: u64,
}

impl ConnectionId {
    pub fn new(addr: IpAddr, seq: u64) -> Self {
        Self { addr, seq }
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[client:{}/{}]", self.addr, self.seq)
    }
}

/// Destination for serialized snapshots.
///
/// An error from `send_text` is final: the connection loop stops.
#[async_trait]
pub trait SnapshotSink: Send {
    async fn send_text(&mut self, text: String) -> Result<(), SendError>;

    /// Service the inbound side until the peer goes away.
    ///
    /// Resolves with `Ok` on an orderly close and `Err` when the transport
    /// fails. Must be cancel safe: the push loop drops it whenever the next
    /// send is due.
    async fn closed(&mut self) -> Result<(), SendError>;
}

#[async_trait]
impl SnapshotSink for WebSocketStream<TcpStream> {
    async fn send_text(&mut self, text: String) -> Result<(), SendError> {
        self.send(Message::text(text)).await?;
        Ok(())
    }

    async fn closed(&mut self) -> Result<(), SendError> {
        // Reading is what makes tungstenite write queued pongs and the close
        // reply, so keep reading past the Close frame until the stream ends.
        while let Some(message) = self.next().await {
            match message {
                Ok(Message::Close(frame)) => trace!("Close frame received: {:?}", frame),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(other) => trace!("Ignoring inbound {} byte frame", other.len()),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Pushes the latest snapshot to one client until it goes away.
///
/// The connection only ever reads the store. Each iteration sends whatever
/// snapshot is current, then waits for the cadence that snapshot calls for.
/// While waiting it services the client's side of the socket, so pings are
/// answered and a close ends the loop right away.
#[derive(Debug)]
pub struct Connection<S> {
    id: ConnectionId,
    sink: S,
    store: Arc<SnapshotStore>,
    cadence: Cadence,
}

impl<S: SnapshotSink> Connection<S> {
    pub fn new(id: ConnectionId, sink: S, store: Arc<SnapshotStore>, cadence: Cadence) -> Self {
        Self {
            id,
            sink,
            store,
            cadence,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Run the push loop.
    ///
    /// Returns when a send fails, the client disconnects, or the store has
    /// been closed.
    pub async fn run(mut self) {
        info!("{} opened connection", self.id);

        while let Some(snapshot) = self.store.read() {
            let delay = self.cadence.delay_for(&snapshot);

            match serde_json::to_string(&*snapshot) {
                Ok(text) => {
                    debug!("{} sending snapshot {}", self.id, snapshot.interface_timestamp);
                    if let Err(e) = self.sink.send_text(text).await {
                        error!("{} {}", self.id, e);
                        break;
                    }
                }
                Err(e) => error!("{} failed to serialize snapshot: {}", self.id, e),
            }

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                result = self.sink.closed() => {
                    match result {
                        Ok(()) => debug!("{} client closed the connection", self.id),
                        Err(e) => warn!("{} {}", self.id, e),
                    }
                    break;
                }
            }
        }

        info!("{} closed connection", self.id);
    }
}
