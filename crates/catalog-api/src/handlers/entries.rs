//! Gallery, entry upload, detail, edit and delete

use crate::auth::AuthUser;
use crate::constants::{GALLERY_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::{EntryDetail, EntryService};
use crate::state::AppState;
use crate::utils::query::QueryParams;
use crate::utils::upload::MultipartForm;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use catalog_core::models::{
    Entry, EntryFields, EntrySummary, GalleryFilter, ImageResponse, UpdateEntryRequest,
};
use catalog_core::AppError;
use catalog_db::Pagination;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
pub struct GalleryResponse {
    pub entries: Vec<EntrySummary>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    /// Distinct non-empty publishers, for the filter dropdown
    pub publishers: Vec<String>,
    pub ranges: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedUploadResponse {
    pub success: bool,
    pub entry: Entry,
    pub image: ImageResponse,
}

#[utoipa::path(
    get,
    path = "/api/entries",
    tag = "entries",
    params(
        ("search" = Option<String>, Query, description = "Matches name, publisher, range or tag name"),
        ("publisher" = Option<String>, Query, description = "Publisher contains"),
        ("range" = Option<String>, Query, description = "Range contains"),
        ("tags" = Option<Vec<Uuid>>, Query, description = "Entries must carry every listed tag"),
        ("page" = Option<i64>, Query, description = "One-based page"),
        ("page_size" = Option<i64>, Query, description = "Defaults to 12, at most 100")
    ),
    responses(
        (status = 200, description = "Gallery page", body = GalleryResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(operation = "list_entries"))]
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let params = QueryParams::from(params);
    let filter = GalleryFilter {
        search: params.get("search"),
        publisher: params.get("publisher"),
        range: params.get("range"),
        tag_ids: params.uuids("tags")?,
    };
    let page_size = params
        .int("page_size")?
        .unwrap_or(GALLERY_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = Pagination::new(params.int("page")?, page_size);

    let (entries, total) = state.db.entries.gallery(&filter, page).await?;
    let entries = EntryService::summaries(&state.db, &state.media, entries).await?;

    Ok(Json(GalleryResponse {
        entries,
        total,
        page: page.page,
        page_size: page.page_size,
        publishers: state.db.entries.distinct_publishers().await?,
        ranges: state.db.entries.distinct_ranges().await?,
    }))
}

#[utoipa::path(
    post,
    path = "/api/entries",
    tag = "entries",
    request_body(
        content_type = "multipart/form-data",
        description = "name, publisher, range, folder_location, notes, repeated tag_ids, image"
    ),
    responses(
        (status = 201, description = "Entry and first image created", body = CreatedUploadResponse),
        (status = 400, description = "Missing name or image", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(username = %user.username, operation = "create_entry"))]
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut form = MultipartForm::read(multipart, state.media.max_upload_size).await?;

    let fields = EntryFields::new(
        form.text("name").unwrap_or_default(),
        form.text("publisher"),
        form.text("range"),
        form.text("folder_location"),
        form.text("notes"),
    );
    let tag_ids = form.uuids("tag_ids")?;
    let image = form
        .take_file("image")
        .ok_or_else(|| AppError::BadRequest("image file is required".to_string()))?;

    let (entry, image) =
        EntryService::create_from_upload(&state.db, &state.media, fields, &tag_ids, image).await?;
    let url = state.media.url(&image.file_path);

    Ok((
        StatusCode::CREATED,
        Json(CreatedUploadResponse {
            success: true,
            entry,
            image: image.into_response(url),
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/entries/{id}",
    tag = "entries",
    params(("id" = Uuid, Path, description = "Entry ID")),
    responses(
        (status = 200, description = "Entry detail", body = EntryDetail),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(entry_id = %id, operation = "get_entry"))]
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(EntryService::detail(&state.db, &state.media, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/entries/{id}",
    tag = "entries",
    params(("id" = Uuid, Path, description = "Entry ID")),
    request_body = UpdateEntryRequest,
    responses(
        (status = 200, description = "Entry updated", body = EntryDetail),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(entry_id = %id, operation = "update_entry"))]
pub async fn update_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateEntryRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;
    let fields = request.fields();
    if fields.name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()).into());
    }

    EntryService::update_entry(
        &state.db,
        &state.media,
        id,
        fields,
        request.tag_ids.as_deref(),
    )
    .await?;

    Ok(Json(EntryService::detail(&state.db, &state.media, id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/entries/{id}",
    tag = "entries",
    params(("id" = Uuid, Path, description = "Entry ID")),
    responses(
        (status = 204, description = "Entry and its files deleted"),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(entry_id = %id, operation = "delete_entry"))]
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    EntryService::delete_entry(&state.db, &state.media, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
