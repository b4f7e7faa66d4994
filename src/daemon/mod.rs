//! Timer daemon.
//!
//! The daemon owns the only [`TimerStore`](crate::store::TimerStore) and is
//! therefore the single writer of the snapshot file:
//! - `service`: mutex-guarded store handle shared by all tasks
//! - `scheduler`: the one shared tick loop
//! - `ipc`: Unix socket server answering CLI requests

pub mod ipc;
pub mod scheduler;
pub mod service;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

pub use ipc::{serve_connection, IpcError, IpcServer, RequestHandler};
pub use scheduler::{Scheduler, TICK_PERIOD};
pub use service::{TickOutcome, TimerService};

use crate::alarm::{build_notifier, AlarmDispatcher};
use crate::config::DaemonConfig;
use crate::store::{JsonFileStore, SystemClock, TimerStore};

/// Runs the daemon until SIGINT or SIGTERM.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the socket cannot be
/// bound.
pub async fn run(config: DaemonConfig) -> Result<()> {
    config.validate().context("Invalid daemon configuration")?;

    // Claim the socket before touching the snapshot so a second daemon
    // exits without writing it.
    let server = IpcServer::new(&config.socket_path)?;

    let store = TimerStore::open(
        Box::new(JsonFileStore::new(&config.state_path)),
        Arc::new(SystemClock),
        config.store,
    );
    let service = TimerService::new(store);

    info!(
        "Daemon listening on {:?} (state: {:?})",
        server.socket_path(),
        config.state_path
    );

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let notifier = Arc::new(build_notifier(&config));
    let dispatcher = tokio::spawn(AlarmDispatcher::new(notifier).run(event_rx));
    let scheduler = tokio::spawn(Scheduler::new(service.clone(), event_tx).run(shutdown_rx));

    let handler = RequestHandler::new(service.clone());
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok(stream) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(stream, &handler).await {
                            debug!("IPC connection failed: {:#}", e);
                        }
                    });
                }
                Err(e) => error!("{:#}", e),
            },
            _ = &mut shutdown => break,
        }
    }

    info!("Shutting down");
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        error!("Scheduler task failed: {}", e);
    }
    // The scheduler held the last event sender, so the dispatcher drains and stops.
    if let Err(e) = dispatcher.await {
        error!("Alarm dispatcher task failed: {}", e);
    }
    service.close().await;
    drop(server);
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
