//! Catalog Storage Library
//!
//! Storage abstraction for entry images and files, with a local filesystem backend.
//!
//! # Storage key format
//!
//! Keys are relative paths such as `uploaded_images/{filename}` or
//! `stlFiles/{publisher}/{range}/{name}/{filename}`; the layout is decided by the
//! naming engine in `catalog-core`. Keys must not contain `..` or a leading `/`.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};
