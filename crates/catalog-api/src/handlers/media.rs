//! Images and entry files

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::EntryService;
use crate::state::AppState;
use crate::utils::upload::MultipartForm;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use catalog_core::models::{EntryFileResponse, FileKind, ImageResponse};
use catalog_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/entries/{id}/images",
    tag = "media",
    params(("id" = Uuid, Path, description = "Entry ID")),
    request_body(content_type = "multipart/form-data", description = "Repeated images"),
    responses(
        (status = 201, description = "Images stored", body = Vec<ImageResponse>),
        (status = 400, description = "No image or not an image", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(entry_id = %id, operation = "add_images"))]
pub async fn add_images(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let mut form = MultipartForm::read(multipart, state.media.max_upload_size).await?;
    let files = form.take_files("images");

    let images = EntryService::add_images(&state.db, &state.media, id, files).await?;
    let response: Vec<ImageResponse> = images
        .into_iter()
        .map(|img| {
            let url = state.media.url(&img.file_path);
            img.into_response(url)
        })
        .collect();

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/entries/{id}/images/{image_id}/primary",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Entry ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image is now primary", body = ImageResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(entry_id = %id, image_id = %image_id, operation = "set_primary_image"))]
pub async fn set_primary_image(
    State(state): State<Arc<AppState>>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let image = state.db.images.set_primary(id, image_id).await?;
    let url = state.media.url(&image.file_path);
    Ok(Json(image.into_response(url)))
}

#[utoipa::path(
    delete,
    path = "/api/entries/{id}/images/{image_id}",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Entry ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 400, description = "Only image of the entry", body = ErrorResponse),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(entry_id = %id, image_id = %image_id, operation = "delete_image"))]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    EntryService::delete_image(&state.db, &state.media, id, image_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/entries/{id}/files/{file}",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Entry ID"),
        ("file" = String, Path, description = "File kind: stl, print or user_print")
    ),
    request_body(content_type = "multipart/form-data", description = "Repeated files"),
    responses(
        (status = 201, description = "Files stored", body = Vec<EntryFileResponse>),
        (status = 400, description = "Unknown kind or extension not allowed", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(entry_id = %id, kind = %kind, username = %user.username, operation = "add_files"))]
pub async fn add_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path((id, kind)): Path<(Uuid, String)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let kind: FileKind = kind
        .parse()
        .map_err(|e: anyhow::Error| AppError::BadRequest(e.to_string()))?;
    let mut form = MultipartForm::read(multipart, state.media.max_upload_size).await?;
    let files = form.take_files("files");

    let stored =
        EntryService::add_files(&state.db, &state.media, id, kind, files, Some(user.id)).await?;
    let response: Vec<EntryFileResponse> = stored
        .into_iter()
        .map(|f| {
            let url = state.media.url(&f.file_path);
            f.into_response(url)
        })
        .collect();

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    delete,
    path = "/api/entries/{id}/files/{file}",
    tag = "media",
    params(
        ("id" = Uuid, Path, description = "Entry ID"),
        ("file" = Uuid, Path, description = "File ID")
    ),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(entry_id = %id, file_id = %file_id, operation = "delete_file"))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path((id, file_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, HttpAppError> {
    EntryService::delete_file(&state.db, &state.media, id, file_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
