//! Bulk tag assignment view and its actions

use crate::constants::ASSIGN_PAGE_SIZE;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::tagging::{
    BulkAssignRequest, BulkAssignResponse, QuickAssignRequest, QuickAssignResponse,
};
use crate::services::{EntryService, TaggingService};
use crate::state::AppState;
use crate::utils::query::QueryParams;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use catalog_core::models::{AssignFilter, EntrySummary, RelationFilter, TagResponse, TagType};
use catalog_db::Pagination;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignStats {
    pub total: i64,
    pub untagged: i64,
    pub tagged: i64,
    /// Entries matching the current filters
    pub filtered: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignViewResponse {
    pub entries: Vec<EntrySummary>,
    pub page: i64,
    pub page_size: i64,
    pub stats: AssignStats,
    pub publishers: Vec<String>,
    pub ranges: Vec<String>,
    /// Active tag types, for the type filter
    pub tag_types: Vec<TagType>,
    /// Tags offered as one-click buttons
    pub quick_tags: Vec<TagResponse>,
    /// Tags of the selected type's reference types, for the reference filter
    pub reference_tags: Vec<TagResponse>,
}

#[utoipa::path(
    get,
    path = "/api/assign",
    tag = "assign",
    params(
        ("search" = Option<String>, Query, description = "Matches name, publisher or range"),
        ("publisher" = Option<String>, Query, description = "Exact publisher"),
        ("range" = Option<String>, Query, description = "Exact range"),
        ("tag_filter" = Option<String>, Query, description = "Entries carrying the tag with this name"),
        ("untagged_only" = Option<bool>, Query, description = "Only entries without tags"),
        ("missing_tag_type" = Option<uuid::Uuid>, Query, description = "Entries with no tag of this type"),
        ("tag_type" = Option<uuid::Uuid>, Query, description = "Quick tags of this type"),
        ("reference_tag" = Option<String>, Query, description = "Quick tags referencing this tag, or `none`"),
        ("page" = Option<i64>, Query, description = "One-based page")
    ),
    responses(
        (status = 200, description = "Assignment view", body = AssignViewResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, params), fields(operation = "assign_view"))]
pub async fn assign_view(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let params = QueryParams::from(params);
    let filter = AssignFilter {
        search: params.get("search"),
        publisher: params.get("publisher"),
        range: params.get("range"),
        tag_name: params.get("tag_filter"),
        untagged_only: params.flag("untagged_only"),
        missing_tag_type: params.uuid("missing_tag_type")?,
    };
    let page = Pagination::new(params.int("page")?, ASSIGN_PAGE_SIZE);

    let (entries, filtered) = state.db.entries.assign_list(&filter, page).await?;
    let entries = EntryService::summaries(&state.db, &state.media, entries).await?;
    let totals = state.db.entries.tagging_stats().await?;

    let tag_type = params.uuid("tag_type")?;
    let (type_filter, reference_filter, reference_tags) = match tag_type {
        Some(type_id) => {
            let mut reference_tags = Vec::new();
            for reference_type in state.db.tag_types.reference_types(type_id).await? {
                reference_tags.extend(
                    state
                        .db
                        .tags
                        .list(RelationFilter::Is(reference_type.id), RelationFilter::Any)
                        .await?,
                );
            }
            reference_tags.sort_by(|a, b| a.name.cmp(&b.name));
            (
                RelationFilter::Is(type_id),
                params.relation("reference_tag")?,
                reference_tags,
            )
        }
        None => (RelationFilter::Any, RelationFilter::Any, Vec::new()),
    };
    let quick_tags = state.db.tags.list(type_filter, reference_filter).await?;

    let tag_types = state
        .db
        .tag_types
        .list()
        .await?
        .into_iter()
        .filter(|t| t.is_active)
        .collect();

    Ok(Json(AssignViewResponse {
        entries,
        page: page.page,
        page_size: page.page_size,
        stats: AssignStats {
            total: totals.total,
            untagged: totals.untagged,
            tagged: totals.tagged,
            filtered,
        },
        publishers: state.db.entries.distinct_publishers().await?,
        ranges: state.db.entries.distinct_ranges().await?,
        tag_types,
        quick_tags: EntryService::tag_responses(&state.db, quick_tags).await?,
        reference_tags: EntryService::tag_responses(&state.db, reference_tags).await?,
    }))
}

#[utoipa::path(
    post,
    path = "/api/assign/bulk",
    tag = "assign",
    request_body = BulkAssignRequest,
    responses(
        (status = 200, description = "Tags added or removed", body = BulkAssignResponse),
        (status = 400, description = "Missing entry IDs or tag IDs", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "bulk_assign"))]
pub async fn bulk_assign(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<BulkAssignRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        TaggingService::bulk_assign(&state.db.entries, &state.db.tags, &request).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/assign/quick",
    tag = "assign",
    request_body = QuickAssignRequest,
    responses(
        (status = 200, description = "Tag toggled", body = QuickAssignResponse),
        (status = 400, description = "Missing entry ID or tag ID", body = ErrorResponse),
        (status = 404, description = "Entry or tag not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "quick_assign"))]
pub async fn quick_assign(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<QuickAssignRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(
        TaggingService::quick_assign(&state.db.entries, &state.db.tags, &request).await?,
    ))
}
