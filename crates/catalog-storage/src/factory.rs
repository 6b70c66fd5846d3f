use crate::{LocalStorage, Storage, StorageResult};
use catalog_core::Config;
use std::sync::Arc;

/// Create the storage backend described by the configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(&config.media_root, config.media_base_url.clone()).await?;
    tracing::info!(
        root = %config.media_root.display(),
        base_url = %config.media_base_url,
        "Local storage initialized"
    );
    Ok(Arc::new(storage))
}
