//! HTTP handlers
//!
//! `import_api` serves the bulk importer under `/upload/api`; everything else is the
//! management API under `/api`.

pub mod assign;
pub mod entries;
pub mod import_api;
pub mod media;
pub mod stats;
pub mod tag_types;
pub mod tags;
