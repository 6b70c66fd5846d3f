//! Tag type CRUD, ordering and visibility flags

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::TaggingService;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use catalog_core::models::{RelationFilter, TagType, TagTypeInput, TagTypeResponse};
use catalog_core::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct ReferenceTagOption {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReferenceTagsResponse {
    pub has_reference: bool,
    pub reference_tagtype_names: Vec<String>,
    /// Tags that may be picked as references by tags of this type
    pub tags: Vec<ReferenceTagOption>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SortOrderItem {
    pub id: Uuid,
    pub sort_order: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SortOrderRequest {
    pub order: Vec<SortOrderItem>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GalleryVisibilityRequest {
    pub show_in_gallery: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadVisibilityRequest {
    pub set_at_upload: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

#[utoipa::path(
    get,
    path = "/api/tag-types",
    tag = "tag-types",
    responses((status = 200, description = "Tag types in display order", body = Vec<TagTypeResponse>))
)]
#[tracing::instrument(skip(state), fields(operation = "list_tag_types"))]
pub async fn list_tag_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.db.tag_types.list_detailed().await?))
}

#[utoipa::path(
    post,
    path = "/api/tag-types",
    tag = "tag-types",
    request_body = TagTypeInput,
    responses(
        (status = 201, description = "Tag type created", body = TagTypeResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Name taken", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, input), fields(operation = "create_tag_type"))]
pub async fn create_tag_type(
    State(state): State<Arc<AppState>>,
    ValidatedJson(input): ValidatedJson<TagTypeInput>,
) -> Result<impl IntoResponse, HttpAppError> {
    TaggingService::check_tag_type(&state.db.tag_types, None, &input).await?;
    let tag_type = state.db.tag_types.create(&input).await?;
    tracing::info!(tag_type_id = %tag_type.id, name = %tag_type.name, "Tag type created");

    Ok((
        StatusCode::CREATED,
        Json(state.db.tag_types.get_detailed(tag_type.id).await?),
    ))
}

#[utoipa::path(
    get,
    path = "/api/tag-types/{id}",
    tag = "tag-types",
    params(("id" = Uuid, Path, description = "Tag type ID")),
    responses(
        (status = 200, description = "Tag type", body = TagTypeResponse),
        (status = 404, description = "Tag type not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(tag_type_id = %id, operation = "get_tag_type"))]
pub async fn get_tag_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.db.tag_types.get_detailed(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/tag-types/{id}",
    tag = "tag-types",
    params(("id" = Uuid, Path, description = "Tag type ID")),
    request_body = TagTypeInput,
    responses(
        (status = 200, description = "Tag type updated", body = TagTypeResponse),
        (status = 400, description = "Invalid input or self reference", body = ErrorResponse),
        (status = 404, description = "Tag type not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, input), fields(tag_type_id = %id, operation = "update_tag_type"))]
pub async fn update_tag_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(input): ValidatedJson<TagTypeInput>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.db.tag_types.require(id).await?;
    TaggingService::check_tag_type(&state.db.tag_types, Some(id), &input).await?;
    state.db.tag_types.update(id, &input).await?;
    Ok(Json(state.db.tag_types.get_detailed(id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tag-types/{id}",
    tag = "tag-types",
    params(("id" = Uuid, Path, description = "Tag type ID")),
    responses(
        (status = 204, description = "Tag type deleted"),
        (status = 400, description = "Tag type still used by tags", body = ErrorResponse),
        (status = 404, description = "Tag type not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(tag_type_id = %id, operation = "delete_tag_type"))]
pub async fn delete_tag_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let removed = state.db.tag_types.delete(id).await?;
    tracing::info!(tag_type_id = %id, name = %removed.name, "Tag type deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/tag-types/{id}/reference-tags",
    tag = "tag-types",
    params(("id" = Uuid, Path, description = "Tag type ID")),
    responses(
        (status = 200, description = "Tags selectable as references", body = ReferenceTagsResponse),
        (status = 404, description = "Tag type not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(tag_type_id = %id, operation = "reference_tags"))]
pub async fn reference_tags(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.db.tag_types.require(id).await?;
    let reference_types = state.db.tag_types.reference_types(id).await?;

    let mut tags = Vec::new();
    for reference_type in &reference_types {
        let of_type = state
            .db
            .tags
            .list(RelationFilter::Is(reference_type.id), RelationFilter::Any)
            .await?;
        tags.extend(of_type.into_iter().map(|t| ReferenceTagOption {
            id: t.id,
            name: t.name,
        }));
    }

    Ok(Json(ReferenceTagsResponse {
        has_reference: !reference_types.is_empty(),
        reference_tagtype_names: reference_types.into_iter().map(|t| t.name).collect(),
        tags,
    }))
}

#[utoipa::path(
    post,
    path = "/api/tag-types/order",
    tag = "tag-types",
    request_body = SortOrderRequest,
    responses(
        (status = 200, description = "Sort orders saved", body = SuccessResponse),
        (status = 400, description = "Negative sort order", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "update_tag_type_order"))]
pub async fn update_tag_type_order(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SortOrderRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if request.order.iter().any(|item| item.sort_order < 0) {
        return Err(AppError::Validation {
            field: "sort_order".to_string(),
            message: "Sort order cannot be negative".to_string(),
        }
        .into());
    }
    let order: Vec<(Uuid, i32)> = request
        .order
        .iter()
        .map(|item| (item.id, item.sort_order))
        .collect();
    let updated = state.db.tag_types.update_order(&order).await?;
    tracing::debug!(updated = updated, "Tag type order saved");

    Ok(Json(SuccessResponse { success: true }))
}

#[utoipa::path(
    post,
    path = "/api/tag-types/{id}/gallery-visibility",
    tag = "tag-types",
    params(("id" = Uuid, Path, description = "Tag type ID")),
    request_body = GalleryVisibilityRequest,
    responses(
        (status = 200, description = "Flag saved", body = TagType),
        (status = 404, description = "Tag type not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(tag_type_id = %id, operation = "set_gallery_visibility"))]
pub async fn set_gallery_visibility(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<GalleryVisibilityRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state
            .db
            .tag_types
            .set_show_in_gallery(id, request.show_in_gallery)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/tag-types/{id}/upload-visibility",
    tag = "tag-types",
    params(("id" = Uuid, Path, description = "Tag type ID")),
    request_body = UploadVisibilityRequest,
    responses(
        (status = 200, description = "Flag saved", body = TagType),
        (status = 404, description = "Tag type not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(tag_type_id = %id, operation = "set_upload_visibility"))]
pub async fn set_upload_visibility(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UploadVisibilityRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        state
            .db
            .tag_types
            .set_set_at_upload(id, request.set_at_upload)
            .await?,
    ))
}
