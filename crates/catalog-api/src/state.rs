//! Application state and sub-state extractors.
//!
//! AppState is split into domain sub-states so handlers can extract only what they need
//! via Axum's `FromRef`.

use catalog_core::Config;
use catalog_db::{
    EntryFileRepository, EntryRepository, ImageRepository, TagRepository, TagTypeRepository,
    UserRepository,
};
use catalog_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

/// Database pool and every repository
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub entries: EntryRepository,
    pub images: ImageRepository,
    pub files: EntryFileRepository,
    pub tags: TagRepository,
    pub tag_types: TagTypeRepository,
    pub users: UserRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            entries: EntryRepository::new(pool.clone()),
            images: ImageRepository::new(pool.clone()),
            files: EntryFileRepository::new(pool.clone()),
            tags: TagRepository::new(pool.clone()),
            tag_types: TagTypeRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Storage backend and upload limits
#[derive(Clone)]
pub struct MediaConfig {
    pub storage: Arc<dyn Storage>,
    pub max_upload_size: usize,
}

impl MediaConfig {
    /// Public URL of a stored object
    pub fn url(&self, key: &str) -> String {
        self.storage.url(key)
    }
}

// ----- AppState -----

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub media: MediaConfig,
    pub config: Config,
    pub is_production: bool,
}

impl AppState {
    pub fn new(pool: PgPool, storage: Arc<dyn Storage>, config: Config) -> Self {
        Self {
            db: DbState::new(pool),
            media: MediaConfig {
                storage,
                max_upload_size: config.max_upload_size_bytes(),
            },
            is_production: config.is_production(),
            config,
        }
    }
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for MediaConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.media.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
