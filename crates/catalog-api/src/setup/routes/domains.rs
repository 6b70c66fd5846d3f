//! Domain route groups (import API, entries, media, tags, assignment).

use crate::constants::{API_PREFIX, IMPORT_PREFIX};
use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn import_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/health/", IMPORT_PREFIX),
            get(handlers::import_api::import_health),
        )
        .route(
            &format!("{}/check-duplicate/", IMPORT_PREFIX),
            get(handlers::import_api::check_duplicate),
        )
        .route(
            &format!("{}/get-tags/", IMPORT_PREFIX),
            get(handlers::import_api::get_tag_names),
        )
        .route(
            &format!("{}/create-entry/", IMPORT_PREFIX),
            post(handlers::import_api::import_create_entry),
        )
        .route(
            &format!("{}/upload-image/", IMPORT_PREFIX),
            post(handlers::import_api::import_upload_image),
        )
        .with_state(state)
}

pub fn entry_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/entries", API_PREFIX),
            get(handlers::entries::list_entries).post(handlers::entries::create_entry),
        )
        .route(
            &format!("{}/entries/{{id}}", API_PREFIX),
            get(handlers::entries::get_entry)
                .put(handlers::entries::update_entry)
                .delete(handlers::entries::delete_entry),
        )
        .route(&format!("{}/stats", API_PREFIX), get(handlers::stats::catalog_stats))
        .with_state(state)
}

pub fn media_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/entries/{{id}}/images", API_PREFIX),
            post(handlers::media::add_images),
        )
        .route(
            &format!("{}/entries/{{id}}/images/{{image_id}}", API_PREFIX),
            axum::routing::delete(handlers::media::delete_image),
        )
        .route(
            &format!("{}/entries/{{id}}/images/{{image_id}}/primary", API_PREFIX),
            post(handlers::media::set_primary_image),
        )
        // `{file}` is the kind on upload and the file id on delete
        .route(
            &format!("{}/entries/{{id}}/files/{{file}}", API_PREFIX),
            post(handlers::media::add_files).delete(handlers::media::delete_file),
        )
        .with_state(state)
}

pub fn tag_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            &format!("{}/tags", API_PREFIX),
            get(handlers::tags::list_tags).post(handlers::tags::create_tag),
        )
        .route(
            &format!("{}/tags/{{id}}", API_PREFIX),
            get(handlers::tags::get_tag)
                .put(handlers::tags::update_tag)
                .delete(handlers::tags::delete_tag),
        )
        .route(
            &format!("{}/tag-types", API_PREFIX),
            get(handlers::tag_types::list_tag_types).post(handlers::tag_types::create_tag_type),
        )
        .route(
            &format!("{}/tag-types/order", API_PREFIX),
            post(handlers::tag_types::update_tag_type_order),
        )
        .route(
            &format!("{}/tag-types/{{id}}", API_PREFIX),
            get(handlers::tag_types::get_tag_type)
                .put(handlers::tag_types::update_tag_type)
                .delete(handlers::tag_types::delete_tag_type),
        )
        .route(
            &format!("{}/tag-types/{{id}}/reference-tags", API_PREFIX),
            get(handlers::tag_types::reference_tags),
        )
        .route(
            &format!("{}/tag-types/{{id}}/gallery-visibility", API_PREFIX),
            post(handlers::tag_types::set_gallery_visibility),
        )
        .route(
            &format!("{}/tag-types/{{id}}/upload-visibility", API_PREFIX),
            post(handlers::tag_types::set_upload_visibility),
        )
        .with_state(state)
}

pub fn assign_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(&format!("{}/assign", API_PREFIX), get(handlers::assign::assign_view))
        .route(
            &format!("{}/assign/bulk", API_PREFIX),
            post(handlers::assign::bulk_assign),
        )
        .route(
            &format!("{}/assign/quick", API_PREFIX),
            post(handlers::assign::quick_assign),
        )
        .with_state(state)
}
