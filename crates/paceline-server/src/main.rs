use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use paceline_core::rooms::RoomBroker;
use paceline_core::{AppConfig, AppState};
use paceline_media::{StorageConfig, StorageManager};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("paceline=info,tower_http=debug")),
        )
        .init();

    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    ensure_data_dirs(&config);

    let db = paceline_db::create_pool(&config.database.url, config.database.max_connections)
        .await?;
    paceline_db::run_migrations(&db).await?;

    let shutdown = Arc::new(tokio::sync::Notify::new());
    let state = AppState {
        db,
        rooms: Arc::new(RoomBroker::new()),
        storage: Arc::new(StorageManager::new(StorageConfig {
            base_path: config.storage.path.clone().into(),
            max_file_size: config.storage.max_upload_size,
        })),
        config: AppConfig {
            jwt_secret: config.auth.jwt_secret.clone(),
            jwt_expiry_seconds: config.auth.jwt_expiry_seconds,
            registration_enabled: config.auth.registration_enabled,
            storage_path: config.storage.path.clone(),
            max_upload_size: config.storage.max_upload_size,
            database_url: config.database.url.clone(),
            public_url: config.server.public_url.clone(),
            worker_id: config.server.worker_id,
        },
        shutdown: shutdown.clone(),
    };

    let app = paceline_api::build_router()
        .merge(paceline_ws::chat_router())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!("listening on {}", config.server.bind_address);

    let shutdown_signal = async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown: ctrl-c received");
            }
            _ = shutdown.notified() => {
                tracing::info!("shutdown: requested internally");
            }
        }
    };

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

fn ensure_data_dirs(config: &config::Config) {
    if let Err(err) = std::fs::create_dir_all(&config.storage.path) {
        tracing::warn!("could not create storage directory: {err}");
    }
    if let Some(path) = config
        .database
        .url
        .strip_prefix("sqlite://")
        .map(|rest| rest.split('?').next().unwrap_or(rest))
    {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::warn!("could not create database directory: {err}");
            }
        }
    }
}
