//! Shared error type for the catalog crates.
//!
//! Every fallible operation in the API ends up as an [`AppError`]; [`ErrorMetadata`]
//! decides its status code and how loudly it is logged. Without the `sqlx` feature
//! the `Database` variant carries a plain message.

use std::io;

use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::tag_graph::TagGraphError;

/// Level an error is logged at when it becomes a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad forms, missing entries, duplicates
    Debug,
    Warn,
    /// Anything that needs an operator
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether the error carries details that should only go to the logs
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failure (tag graph rules, form fields)
    #[error("Validation failed on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate resource; `entry_id` points at the existing entry when known
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        entry_id: Option<Uuid>,
    },

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        if let SqlxError::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return AppError::Conflict {
                    message: format!("A record with this value already exists ({})", constraint),
                    entry_id: None,
                };
            }
        }
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

impl From<TagGraphError> for AppError {
    fn from(err: TagGraphError) -> Self {
        AppError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

/// How a variant is reported: status, code, retry hint, log treatment
#[derive(Debug, Clone, Copy)]
struct Class {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

/// Failures on our side: 500, retryable, details kept for the logs
const fn server_fault(code: &'static str) -> Class {
    Class {
        status: 500,
        code,
        recoverable: true,
        action: Some("Retry after a short delay"),
        sensitive: true,
        level: LogLevel::Error,
    }
}

/// Requests the caller has to change before retrying
const fn caller_fault(status: u16, code: &'static str, action: &'static str) -> Class {
    Class {
        status,
        code,
        recoverable: false,
        action: Some(action),
        sensitive: false,
        level: LogLevel::Debug,
    }
}

fn classify(err: &AppError) -> Class {
    match err {
        AppError::Database(_) => server_fault("DATABASE_ERROR"),
        AppError::Storage(_) => server_fault("STORAGE_ERROR"),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            server_fault("INTERNAL_ERROR")
        }
        AppError::InvalidInput(_) => caller_fault(
            400,
            "INVALID_INPUT",
            "Check request parameters and try again",
        ),
        AppError::BadRequest(_) => {
            caller_fault(400, "BAD_REQUEST", "Check request format and parameters")
        }
        AppError::Validation { .. } => caller_fault(
            400,
            "VALIDATION_ERROR",
            "Fix the highlighted field and resubmit",
        ),
        AppError::NotFound(_) => caller_fault(404, "NOT_FOUND", "Verify the resource ID exists"),
        AppError::Conflict { .. } => caller_fault(
            409,
            "CONFLICT",
            "Use the existing entry instead of creating a new one",
        ),
        AppError::PayloadTooLarge(_) => {
            caller_fault(413, "PAYLOAD_TOO_LARGE", "Upload a smaller file")
        }
        AppError::Unauthorized(_) => caller_fault(
            401,
            "UNAUTHORIZED",
            "Check username, password and staff permission",
        ),
    }
}

impl AppError {
    /// Variant name reported as `error_type`
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::Validation { .. } => "Validation",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict { .. } => "Conflict",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
            AppError::Unauthorized(_) => "Unauthorized",
        }
    }

    /// Field name for field-level validation errors
    pub fn field(&self) -> Option<&str> {
        match self {
            AppError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Existing entry id carried by a duplicate-entry conflict
    pub fn conflicting_entry(&self) -> Option<Uuid> {
        match self {
            AppError::Conflict { entry_id, .. } => *entry_id,
            _ => None,
        }
    }

    /// Display text followed by up to five `Caused by:` lines
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut chain = std::iter::successors(self.source(), |&err| err.source());
        for err in chain.by_ref().take(5) {
            details.push_str(&format!("\n  Caused by: {}", err));
        }
        if chain.next().is_some() {
            details.push_str("\n  ... (truncated)");
        }
        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        classify(self).status
    }

    fn error_code(&self) -> &'static str {
        classify(self).code
    }

    fn is_recoverable(&self) -> bool {
        classify(self).recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        classify(self).action
    }

    fn is_sensitive(&self) -> bool {
        classify(self).sensitive
    }

    fn log_level(&self) -> LogLevel {
        classify(self).level
    }

    // Server-side failures surface their message; staff are the only API callers.
    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => self.to_string(),
            AppError::Validation { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::InternalWithSource { message, .. } => message.clone(),
            AppError::Storage(msg)
            | AppError::InvalidInput(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Internal(msg)
            | AppError::Unauthorized(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert!(err.client_message().starts_with("Database error"));
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_detailed_message_walks_source_chain() {
        let err = AppError::from(anyhow::anyhow!("disk full").context("writing thumbnail"));
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("\n  Caused by: writing thumbnail"));
        assert!(details.contains("\n  Caused by: disk full"));
        assert!(!details.contains("truncated"));

        let deep = (0..8).fold(anyhow::anyhow!("root"), |err, i| err.context(format!("layer {i}")));
        let details = AppError::from(deep).detailed_message();
        assert_eq!(details.matches("Caused by:").count(), 5);
        assert!(details.ends_with("... (truncated)"));
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Entry 42 not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Entry 42 not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_conflict_carries_entry_id() {
        let id = Uuid::new_v4();
        let err = AppError::Conflict {
            message: "Entry already exists".to_string(),
            entry_id: Some(id),
        };
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.client_message(), "Entry already exists");
        assert_eq!(err.conflicting_entry(), Some(id));
    }

    #[test]
    fn test_tag_graph_error_becomes_field_error() {
        let err: AppError = TagGraphError::TagSelfReference.into();
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.field(), Some("reference_tags"));
        assert_eq!(err.client_message(), "A tag cannot reference itself.");
    }

    #[test]
    fn test_internal_error_exposes_message() {
        let err = AppError::from(anyhow::anyhow!("disk full"));
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.client_message(), "disk full");
        assert_eq!(err.error_type(), "Internal");
    }

    #[test]
    fn test_error_metadata_suggested_actions() {
        let err = AppError::NotFound("test".to_string());
        assert_eq!(err.suggested_action(), Some("Verify the resource ID exists"));

        let err = AppError::InvalidInput("test".to_string());
        assert_eq!(
            err.suggested_action(),
            Some("Check request parameters and try again")
        );
    }
}
