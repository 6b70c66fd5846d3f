use crate::constants::LATEST_IMAGES;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use catalog_core::models::CatalogStats;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/api/stats",
    tag = "entries",
    responses(
        (status = 200, description = "Catalogue counters and latest uploads", body = CatalogStats),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "catalog_stats"))]
pub async fn catalog_stats(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (total_publishers, total_ranges) = state.db.images.distinct_counts().await?;
    let latest_images = state
        .db
        .images
        .latest(LATEST_IMAGES)
        .await?
        .into_iter()
        .map(|img| {
            let url = state.media.url(&img.file_path);
            img.into_response(url)
        })
        .collect();

    Ok(Json(CatalogStats {
        total_images: state.db.images.count().await?,
        total_tags: state.db.tags.count().await?,
        total_publishers,
        total_ranges,
        latest_images,
    }))
}
