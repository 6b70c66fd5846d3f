//! OpenAPI documentation.
//! Served at `/api-docs/openapi.json` and rendered by RapiDoc under `/docs`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use crate::services;
use crate::setup::routes::health;
use catalog_core::models;

/// Every catalogue endpoint except `/health` uses HTTP Basic
struct BasicAuth;

impl Modify for BasicAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
        }
    }
}

/// Returns the OpenAPI spec served by the API.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "Miniature catalogue: entries with images and print files, typed tags with reference rules, bulk tag assignment and the import API used by the bulk importer."
    ),
    modifiers(&BasicAuth),
    security(("basic_auth" = [])),
    paths(
        health::health_check,
        // Import API
        handlers::import_api::import_health,
        handlers::import_api::check_duplicate,
        handlers::import_api::get_tag_names,
        handlers::import_api::import_create_entry,
        handlers::import_api::import_upload_image,
        // Entries
        handlers::entries::list_entries,
        handlers::entries::create_entry,
        handlers::entries::get_entry,
        handlers::entries::update_entry,
        handlers::entries::delete_entry,
        handlers::stats::catalog_stats,
        // Images and files
        handlers::media::add_images,
        handlers::media::set_primary_image,
        handlers::media::delete_image,
        handlers::media::add_files,
        handlers::media::delete_file,
        // Tags
        handlers::tags::list_tags,
        handlers::tags::create_tag,
        handlers::tags::get_tag,
        handlers::tags::update_tag,
        handlers::tags::delete_tag,
        // Tag types
        handlers::tag_types::list_tag_types,
        handlers::tag_types::create_tag_type,
        handlers::tag_types::get_tag_type,
        handlers::tag_types::update_tag_type,
        handlers::tag_types::delete_tag_type,
        handlers::tag_types::reference_tags,
        handlers::tag_types::update_tag_type_order,
        handlers::tag_types::set_gallery_visibility,
        handlers::tag_types::set_upload_visibility,
        // Assignment
        handlers::assign::assign_view,
        handlers::assign::bulk_assign,
        handlers::assign::quick_assign,
    ),
    components(
        schemas(
            // Core models
            models::Entry,
            models::EntrySummary,
            models::CreateEntryRequest,
            models::UpdateEntryRequest,
            models::CatalogStats,
            models::TaggingStats,
            models::Image,
            models::ImageResponse,
            models::FileKind,
            models::EntryFile,
            models::EntryFileResponse,
            models::Tag,
            models::TagResponse,
            models::TagInput,
            models::TagType,
            models::TagTypeResponse,
            models::TagTypeInput,
            // Service payloads
            services::EntryDetail,
            services::tagging::BulkAction,
            services::tagging::QuickAction,
            services::tagging::BulkAssignRequest,
            services::tagging::BulkAssignResponse,
            services::tagging::QuickAssignRequest,
            services::tagging::QuickAssignResponse,
            // Handler responses
            health::HealthCheckResponse,
            handlers::import_api::ImportHealthResponse,
            handlers::import_api::DuplicateResponse,
            handlers::import_api::TagNamesResponse,
            handlers::import_api::CreatedEntryResponse,
            handlers::import_api::UploadedImageResponse,
            handlers::entries::GalleryResponse,
            handlers::entries::CreatedUploadResponse,
            handlers::tag_types::ReferenceTagOption,
            handlers::tag_types::ReferenceTagsResponse,
            handlers::tag_types::SortOrderItem,
            handlers::tag_types::SortOrderRequest,
            handlers::tag_types::GalleryVisibilityRequest,
            handlers::tag_types::UploadVisibilityRequest,
            handlers::tag_types::SuccessResponse,
            handlers::assign::AssignStats,
            handlers::assign::AssignViewResponse,
            // Error
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Liveness and database check"),
        (name = "import", description = "Import API used by the bulk importer"),
        (name = "entries", description = "Catalogue entries and the gallery"),
        (name = "media", description = "Entry images and print files"),
        (name = "tags", description = "Tags and their reference rules"),
        (name = "tag-types", description = "Tag types, ordering and visibility"),
        (name = "assign", description = "Bulk and quick tag assignment")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_catalogue_paths() {
        let spec = get_openapi_spec();
        let paths = &spec.paths.paths;
        assert!(paths.contains_key("/upload/api/create-entry/"));
        assert!(paths.contains_key("/api/entries/{id}"));
        assert!(paths.contains_key("/api/assign/bulk"));
        assert!(paths.contains_key("/health"));
    }

    #[test]
    fn test_openapi_declares_basic_auth() {
        let spec = get_openapi_spec();
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("basic_auth"));
    }
}
