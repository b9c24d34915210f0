// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `vaulthub serve` command implementation.
//!
//! Opens the record store, wires the services and runs the gateway until
//! SIGINT or SIGTERM.

use std::sync::Arc;

use tracing::{info, warn};
use vaulthub_config::VaulthubConfig;
use vaulthub_core::{RecordStore, VaulthubError};
use vaulthub_gateway::{AppState, start_server};
use vaulthub_storage::SqliteStore;

pub async fn run_serve(config: VaulthubConfig) -> Result<(), VaulthubError> {
    init_tracing(&config.server.log_level);

    info!(
        database = %config.storage.database_path,
        pbkdf2_iterations = config.transport.pbkdf2_iterations,
        rate_limit = config.rate_limit.enabled,
        "starting vaulthub serve"
    );

    let store = Arc::new(SqliteStore::open(&config.storage).await?);
    let state = AppState::assemble(store.clone(), &config)?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let served = start_server(&addr, state, shutdown_signal()).await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close record store cleanly");
    }
    served?;
    info!("vaulthub serve shutdown complete");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
        _ = terminate => info!("received SIGTERM, initiating shutdown"),
    }
}

/// `RUST_LOG` wins; otherwise `vaulthub=<level>,warn`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vaulthub={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
