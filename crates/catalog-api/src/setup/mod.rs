//! Startup: configuration check, logging, pool, storage and router

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use catalog_core::Config;
use std::sync::Arc;

/// Build the shared state and the router for `config`
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config.validate().context("Invalid configuration")?;
    crate::telemetry::init_telemetry(config.json_logs());
    tracing::info!(environment = %config.environment, "Starting catalog API");

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = Arc::new(AppState::new(pool, storage, config.clone()));
    let router = routes::setup_routes(&config, state.clone())?;
    Ok((state, router))
}
