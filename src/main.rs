// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;
use std::sync::Arc;

use redb::Database;
use revenant_wallet_web::{
    api::router,
    auth::GoogleIdentityProvider,
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    session::{
        MemorySessionBackend, RedbSessionBackend, SessionBackend, SessionStore, SessionSweeper,
    },
    state::AppState,
    storage::{self, UserRepository},
    wallet::CircleClient,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine; real deployments use the environment.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let config = AppConfig::from_env()?;

    let (session_backend, db): (Arc<dyn SessionBackend>, Arc<Database>) = match &config.data_dir
    {
        Some(dir) => {
            let db = storage::open_database(dir)?;
            info!(data_dir = %dir.display(), "Using redb storage");
            (Arc::new(RedbSessionBackend::new(db.clone())?), db)
        }
        None => {
            warn!("DATA_DIR not set; sessions and accounts are kept in memory only");
            (Arc::new(MemorySessionBackend::new()), storage::open_in_memory()?)
        }
    };

    let sessions = Arc::new(SessionStore::new(session_backend, config.session.clone()));
    let users = Arc::new(UserRepository::new(db)?);
    let identity = Arc::new(GoogleIdentityProvider::new(config.google.clone())?);
    let wallets = Arc::new(CircleClient::new(config.circle.clone())?);

    let state = AppState {
        sessions: sessions.clone(),
        users,
        identity,
        wallets,
        wallet_chains: Arc::from(config.wallet_chains.clone()),
        callback_url: config.callback_url(),
    };
    let app = router(state);

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(
        SessionSweeper::new(sessions)
            .with_interval(config.sweep_interval)
            .run(shutdown.clone()),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        addr = %config.bind_addr,
        public_url = %config.public_base_url,
        chains = ?config.wallet_chains,
        "Revenant wallet web listening (docs at /docs)"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    sweeper.await?;
    info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    match LogFormat::from_env() {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

/// Resolves on Ctrl-C and cancels background tasks.
async fn shutdown_signal(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl-C; shutting down"),
    }
    shutdown.cancel();
}
