use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rad8_types::Snapshot;
use tokio::sync::watch;
use tracing::{info, warn};

use rad8_bridge::poller::interface_timestamp;
use rad8_bridge::{
    logging, AlarmTracker, AppConfig, BroadcastServer, DevicePoller, HistoryFile, LineSource,
    ReplaySource, SerialSource, SnapshotStore,
};

#[derive(Parser, Debug)]
#[command(name = "rad8-bridge")]
#[command(about = "Serve a Masimo RAD-8 pulse oximeter's readings and alarms over a websocket feed")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level or filter directive (e.g. "debug", "rad8_bridge=trace")
    #[arg(short, long)]
    loglevel: Option<String>,

    /// Replay a captured device log instead of reading the serial port
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Address to serve the feed on (host:port)
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(level) = args.loglevel {
        config.logging.level = level;
    }
    if let Some(listen) = args.listen {
        config.broadcast.listen = listen;
    }

    logging::init(&config.logging.level, config.logging.file_path())?;

    let listen = config
        .broadcast
        .listen_addr()
        .with_context(|| format!("Invalid listen address '{}'", config.broadcast.listen))?;

    let source: Box<dyn LineSource> = match args.replay {
        Some(path) => Box::new(ReplaySource::new(path)),
        None => Box::new(SerialSource::new(
            config.device.port.clone(),
            config.device.baud_rate,
            config.device.read_timeout(),
        )),
    };
    info!("Reading device lines from {}", source.description());

    let tracker = AlarmTracker::new(
        Some(HistoryFile::new(&config.history.path)),
        config.history.capacity,
    );
    let store = Arc::new(SnapshotStore::new(
        Snapshot::builder(interface_timestamp())
            .active_alarms(tracker.active_alarms())
            .history(tracker.history())
            .build(),
    ));

    let server = BroadcastServer::bind(listen, store.clone(), config.broadcast.cadence())
        .await
        .with_context(|| format!("Failed to bind {}", listen))?;

    let poller = DevicePoller::new(source, tracker, store.clone(), config.poll.period()).start();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server_task = tokio::spawn(server.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    poller.stop().await;
    store.close();
    let _ = shutdown_tx.send(true);
    if let Err(e) = server_task.await {
        warn!("Websocket server task failed: {}", e);
    }

    Ok(())
}
