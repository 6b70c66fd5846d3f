//! Storage setup and initialization

use anyhow::{Context, Result};
use catalog_core::Config;
use catalog_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize media storage")?;
    Ok(storage)
}
