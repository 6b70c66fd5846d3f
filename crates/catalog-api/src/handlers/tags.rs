//! Tag CRUD

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::{EntryService, TaggingService};
use crate::state::AppState;
use crate::utils::query::QueryParams;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use catalog_core::models::{TagInput, TagResponse};
use catalog_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "tags",
    params(
        ("tag_type" = Option<String>, Query, description = "Tag type ID, or `none` for untyped tags"),
        ("reference_tag" = Option<String>, Query, description = "Reference tag ID, or `none` for tags without references")
    ),
    responses(
        (status = 200, description = "Tags in display order", body = Vec<TagResponse>),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(operation = "list_tags"))]
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let params = QueryParams::from(params);
    let tags = state
        .db
        .tags
        .list(params.relation("tag_type")?, params.relation("reference_tag")?)
        .await?;
    Ok(Json(EntryService::tag_responses(&state.db, tags).await?))
}

#[utoipa::path(
    post,
    path = "/api/tags",
    tag = "tags",
    request_body = TagInput,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 400, description = "Reference rules violated", body = ErrorResponse),
        (status = 409, description = "Name taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, input), fields(operation = "create_tag"))]
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<TagInput>,
) -> Result<impl IntoResponse, HttpAppError> {
    TaggingService::check_tag(&state.db.tags, &state.db.tag_types, None, &input).await?;
    let tag = state.db.tags.create(&input).await?;
    tracing::info!(tag_id = %tag.id, name = %tag.name, "Tag created");

    let references = state.db.tags.reference_ids(tag.id).await?;
    Ok((StatusCode::CREATED, Json(tag.into_response(references))))
}

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    tag = "tags",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(tag_id = %id, operation = "get_tag"))]
pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tag = state.db.tags.require(id).await?;
    let references = state.db.tags.reference_ids(id).await?;
    Ok(Json(tag.into_response(references)))
}

#[utoipa::path(
    put,
    path = "/api/tags/{id}",
    tag = "tags",
    params(("id" = Uuid, Path, description = "Tag ID")),
    request_body = TagInput,
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 400, description = "Reference rules violated", body = ErrorResponse),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, input), fields(tag_id = %id, operation = "update_tag"))]
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<TagInput>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.db.tags.require(id).await?;
    TaggingService::check_tag(&state.db.tags, &state.db.tag_types, Some(id), &input).await?;

    let tag = state.db.tags.update(id, &input).await?;
    let references = state.db.tags.reference_ids(id).await?;
    Ok(Json(tag.into_response(references)))
}

#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    tag = "tags",
    params(("id" = Uuid, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 404, description = "Tag not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(tag_id = %id, operation = "delete_tag"))]
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !state.db.tags.delete(id).await? {
        return Err(AppError::NotFound(format!("Tag {} not found", id)).into());
    }
    Ok(StatusCode::NO_CONTENT)
}
