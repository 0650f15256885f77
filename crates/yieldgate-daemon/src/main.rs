//! yieldgate-daemon: the yield-claim attestation ledger daemon.

use std::sync::Arc;

use tracing::{error, info};
use yieldgate_daemon::config::DaemonConfig;
use yieldgate_daemon::events::Event;
use yieldgate_daemon::rpc::RpcServer;
use yieldgate_daemon::DaemonState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing; RUST_LOG overrides the configured level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!("yieldgate={}", config.logging.log_level))
    })?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("yieldgate daemon starting");

    // 3. Open database and restore ledgers
    let socket_path = config.socket_path();
    let state = Arc::new(DaemonState::open(config)?);

    // 4. Log committed events
    let mut events = state.event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(
                event = %event.event_type,
                seq = event.seq,
                payload = %event.payload,
                "event"
            );
        }
    });

    // 5. Start IPC server
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    state.event_bus.emit(Event::system(
        "DaemonStarted",
        serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }),
    ));

    // 6. Run the RPC server until shutdown
    let mut shutdown_rx = state.shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "RPC server error");
            }
        }
        _ = shutdown_rx.recv() => {
            info!("shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("daemon stopped");
    Ok(())
}
