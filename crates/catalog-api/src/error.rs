//! HTTP error response conversion
//!
//! **Handler pattern:** return `Result<impl IntoResponse, HttpAppError>` and use `?` on
//! anything that converts into `AppError`; the error then renders with a consistent
//! status, body and log line.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use catalog_core::{AppError, ErrorMetadata, LogLevel};
use catalog_storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Realm announced on 401 responses
pub const AUTH_REALM: &str = "Basic realm=\"API\"";

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Form field a validation error belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Existing entry behind a duplicate-entry conflict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(err: &AppError, show_details: bool) -> Self {
        Self {
            success: false,
            error: err.client_message(),
            error_type: Some(err.error_type().to_string()),
            code: err.error_code().to_string(),
            recoverable: err.is_recoverable(),
            suggested_action: err.suggested_action().map(String::from),
            field: err.field().map(String::from),
            entry_id: err.conflicting_entry(),
            details: show_details.then(|| err.detailed_message()),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rules: IntoResponse and AppError both live in other crates)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        })
    }
}

/// Unparseable bodies are `Invalid JSON`; well-formed JSON of the wrong shape names
/// the problem.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        let err = match rejection {
            JsonRejection::JsonDataError(e) => {
                AppError::InvalidInput(format!("Invalid request body: {}", e.body_text()))
            }
            _ => AppError::InvalidInput("Invalid JSON".to_string()),
        };
        HttpAppError(err)
    }
}

/// JSON body extractor that answers bad bodies with [`ErrorResponse`] instead of
/// axum's plain-text rejection.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error,
                error_type = error_type,
                details = %error.detailed_message(),
                "Error occurred"
            );
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("APP_ENV"))
        .map(|env| env.to_lowercase() == "production" || env.to_lowercase() == "prod")
        .unwrap_or(false)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        // The error chain stays in the logs for sensitive errors and in production.
        let show_details = !is_production_env() && !app_error.is_sensitive();
        let body = Json(ErrorResponse::from_app_error(app_error, show_details));

        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(AUTH_REALM));
        }
        response
    }
}

/// Map a storage failure onto the shared error type
pub fn storage_error(err: StorageError) -> AppError {
    match err {
        StorageError::NotFound(msg) => AppError::NotFound(msg),
        StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
        StorageError::AlreadyExists(msg) => AppError::Conflict {
            message: format!("File already exists: {}", msg),
            entry_id: None,
        },
        StorageError::IoError(err) => AppError::Storage(format!("IO error: {}", err)),
        other => AppError::Storage(other.to_string()),
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        HttpAppError(storage_error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_storage_error_not_found() {
        let HttpAppError(app_err) = StorageError::NotFound("File not found".to_string()).into();
        match app_err {
            AppError::NotFound(msg) => assert_eq!(msg, "File not found"),
            _ => panic!("Expected NotFound variant"),
        }
    }

    #[test]
    fn test_from_storage_error_upload_failed() {
        let HttpAppError(app_err) = StorageError::UploadFailed("disk full".to_string()).into();
        match app_err {
            AppError::Storage(msg) => assert!(msg.contains("disk full")),
            _ => panic!("Expected Storage variant"),
        }
    }

    #[test]
    fn test_from_storage_error_invalid_key() {
        let HttpAppError(app_err) = StorageError::InvalidKey("../etc".to_string()).into();
        assert!(matches!(app_err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_from_storage_error_already_exists() {
        let HttpAppError(app_err) =
            StorageError::AlreadyExists("uploaded_images/a.jpg".to_string()).into();
        assert!(matches!(app_err, AppError::Conflict { .. }));
    }

    #[test]
    fn test_unauthorized_sets_www_authenticate() {
        let response =
            HttpAppError(AppError::Unauthorized("Authentication required".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"API\""
        );
    }

    #[test]
    fn test_not_found_has_no_auth_header() {
        let response = HttpAppError(AppError::NotFound("Entry x not found".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let entry_id = Uuid::new_v4();
        let err = AppError::Conflict {
            message: "Entry already exists".to_string(),
            entry_id: Some(entry_id),
        };
        let json = serde_json::to_value(ErrorResponse::from_app_error(&err, false)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Entry already exists");
        assert_eq!(json["code"], "CONFLICT");
        assert_eq!(json["entry_id"], entry_id.to_string());
        assert!(json.get("field").is_none());
        assert!(json.get("details").is_none());
    }

    #[test]
    fn test_validation_error_carries_field() {
        let err = AppError::Validation {
            field: "reference_tags".to_string(),
            message: "A tag cannot reference itself.".to_string(),
        };
        let json = serde_json::to_value(ErrorResponse::from_app_error(&err, true)).unwrap();
        assert_eq!(json["field"], "reference_tags");
        assert_eq!(json["error"], "A tag cannot reference itself.");
        assert!(json["details"].as_str().is_some());
    }
}
