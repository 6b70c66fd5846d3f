//! Route prefixes

/// Management API
pub const API_PREFIX: &str = "/api";

/// Import API used by the bulk importer. Paths keep their trailing slash.
pub const IMPORT_PREFIX: &str = "/upload/api";

/// Gallery page size
pub const GALLERY_PAGE_SIZE: i64 = 12;

/// Largest page size a gallery request may ask for
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page size of the tag assignment view
pub const ASSIGN_PAGE_SIZE: i64 = 24;

/// Images shown on the landing page
pub const LATEST_IMAGES: i64 = 4;

/// Failed sign-ins allowed per client within [`AUTH_FAILURE_WINDOW_SECS`]
pub const AUTH_MAX_FAILURES: u32 = 10;

pub const AUTH_FAILURE_WINDOW_SECS: u64 = 900;
