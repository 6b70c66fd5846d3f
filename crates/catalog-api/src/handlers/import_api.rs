//! Endpoints driven by the bulk importer

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::ImportService;
use crate::state::AppState;
use crate::utils::upload::MultipartForm;
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use catalog_core::models::CreateEntryRequest;
use catalog_core::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportHealthResponse {
    pub success: bool,
    pub status: String,
    pub authenticated: bool,
    pub username: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DuplicateQuery {
    pub name: Option<String>,
    pub publisher: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DuplicateResponse {
    pub success: bool,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagNamesResponse {
    pub success: bool,
    /// Tag names keyed by tag type name
    pub tags: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedEntryResponse {
    pub success: bool,
    pub entry_id: Uuid,
    pub entry_name: String,
    pub tags_assigned: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedImageResponse {
    pub success: bool,
    pub image_id: Uuid,
    pub filename: String,
    pub is_primary: bool,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[utoipa::path(
    get,
    path = "/upload/api/health/",
    tag = "import",
    responses(
        (status = 200, description = "Credentials accepted", body = ImportHealthResponse),
        (status = 401, description = "Authentication failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(user), fields(username = %user.username, operation = "import_health"))]
pub async fn import_health(user: AuthUser) -> Json<ImportHealthResponse> {
    Json(ImportHealthResponse {
        success: true,
        status: "ok".to_string(),
        authenticated: true,
        username: user.username,
    })
}

#[utoipa::path(
    get,
    path = "/upload/api/check-duplicate/",
    tag = "import",
    params(DuplicateQuery),
    responses(
        (status = 200, description = "Duplicate check result", body = DuplicateResponse),
        (status = 400, description = "Name missing", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "check_duplicate"))]
pub async fn check_duplicate(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DuplicateQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let name = non_blank(query.name)
        .ok_or_else(|| AppError::BadRequest("Name parameter required".to_string()))?;
    let publisher = non_blank(query.publisher);
    let range = non_blank(query.range);

    let existing = state
        .db
        .entries
        .find_duplicate(&name, publisher.as_deref(), range.as_deref())
        .await?;

    Ok(Json(DuplicateResponse {
        success: true,
        exists: existing.is_some(),
        entry_id: existing.as_ref().map(|e| e.id),
        entry_name: existing.map(|e| e.name),
    }))
}

#[utoipa::path(
    get,
    path = "/upload/api/get-tags/",
    tag = "import",
    responses(
        (status = 200, description = "Tag names per tag type", body = TagNamesResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "get_tag_names"))]
pub async fn get_tag_names(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tags = state.db.tag_types.names_by_type().await?;
    Ok(Json(TagNamesResponse {
        success: true,
        tags: tags.into_iter().collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/upload/api/create-entry/",
    tag = "import",
    request_body = CreateEntryRequest,
    responses(
        (status = 201, description = "Entry created", body = CreatedEntryResponse),
        (status = 400, description = "Invalid JSON or missing name", body = ErrorResponse),
        (status = 409, description = "Entry already exists", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "import_create_entry"))]
pub async fn import_create_entry(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateEntryRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let created = ImportService::create_entry(&state.db.pool, &state.db.entries, &request).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedEntryResponse {
            success: true,
            entry_id: created.entry.id,
            entry_name: created.entry.name,
            tags_assigned: created.tags_assigned,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/upload/api/upload-image/",
    tag = "import",
    request_body(content_type = "multipart/form-data", description = "entry_id, image, is_primary"),
    responses(
        (status = 201, description = "Image stored", body = UploadedImageResponse),
        (status = 400, description = "Missing entry_id or image", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "import_upload_image"))]
pub async fn import_upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut form = MultipartForm::read(multipart, state.media.max_upload_size).await?;

    let entry_id = form
        .text("entry_id")
        .ok_or_else(|| AppError::BadRequest("entry_id is required".to_string()))?;
    let file = form
        .take_file("image")
        .ok_or_else(|| AppError::BadRequest("image file is required".to_string()))?;
    let entry_id = Uuid::parse_str(&entry_id)
        .map_err(|_| AppError::NotFound(format!("Entry {} not found", entry_id)))?;
    let is_primary = form
        .text("is_primary")
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));

    let entry = state.db.entries.require(entry_id).await?;
    let image = ImportService::upload_image(
        &state.media.storage,
        &state.db.images,
        &entry,
        file,
        is_primary,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadedImageResponse {
            success: true,
            image_id: image.id,
            filename: image.filename().to_string(),
            is_primary: image.is_primary,
        }),
    ))
}
