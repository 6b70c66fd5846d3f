//! Catalog Core Library
//!
//! Domain models, error types, configuration, the filename naming engine and the
//! tag graph validator shared by every catalog crate.

pub mod config;
pub mod error;
pub mod models;
pub mod naming;
pub mod tag_graph;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use naming::{to_camel_case, FileMetadata};
pub use tag_graph::{TagGraphError, TagRef};
