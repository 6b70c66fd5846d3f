//! Business operations shared by the handlers
//!
//! Services are unit structs with associated functions; they take the repositories
//! and storage they need and never touch HTTP types.

pub mod catalog;
pub mod import;
pub mod media_lifecycle;
pub mod tagging;

pub use catalog::{EntryDetail, EntryService};
pub use import::{ImportService, ImportedEntry};
pub use media_lifecycle::MediaLifecycleService;
pub use tagging::TaggingService;
