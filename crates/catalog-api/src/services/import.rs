//! Entry creation and image upload for the bulk import API

use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_core::models::{CreateEntryRequest, Entry, EntryFields, Image, IMPORT_TAG_TYPES};
use catalog_core::naming::image_key;
use catalog_core::validation::checked_image_extension;
use catalog_core::AppError;
use catalog_db::{
    EntryRepository, ImageRepository, TagRepository, TagTypeRepository, TransactionGuard,
};
use catalog_storage::Storage;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::storage_error;
use crate::utils::upload::UploadedFile;

/// Entry created through the import API
#[derive(Debug, Clone)]
pub struct ImportedEntry {
    pub entry: Entry,
    /// Distinct tags linked to the new entry
    pub tags_assigned: usize,
}

pub struct ImportService;

impl ImportService {
    /// Create an entry with its tags in one transaction.
    ///
    /// Tag types and tags named in the request are created when missing. An existing
    /// tag keeps its type.
    #[tracing::instrument(skip(pool, entries, request), fields(entry.name = %request.name))]
    pub async fn create_entry(
        pool: &PgPool,
        entries: &EntryRepository,
        request: &CreateEntryRequest,
    ) -> Result<ImportedEntry, AppError> {
        let fields = EntryFields::new(
            request.name.clone(),
            request.publisher.clone(),
            request.range.clone(),
            request.folder_location.clone(),
            None,
        );
        if fields.name.is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }

        if let Some(existing) = entries
            .find_duplicate(
                &fields.name,
                fields.publisher.as_deref(),
                fields.range.as_deref(),
            )
            .await?
        {
            return Err(AppError::Conflict {
                message: "Entry already exists".to_string(),
                entry_id: Some(existing.id),
            });
        }

        let mut tx = TransactionGuard::begin(pool).await?;
        let entry = EntryRepository::insert(&mut **tx, &fields).await?;

        // importer-known types exist after any create-entry, tagged or not
        for (type_name, _, _) in IMPORT_TAG_TYPES {
            TagTypeRepository::get_or_create_for_import(&mut **tx, type_name).await?;
        }

        let mut tag_ids: BTreeSet<Uuid> = BTreeSet::new();
        for (type_name, tag_names) in &request.tags {
            let type_name = type_name.trim();
            let names: Vec<&str> = tag_names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .collect();
            if type_name.is_empty() || names.is_empty() {
                continue;
            }

            let tag_type = TagTypeRepository::get_or_create_for_import(&mut **tx, type_name).await?;
            for name in names {
                let tag = TagRepository::get_or_create_in(&mut **tx, name, tag_type.id).await?;
                tag_ids.insert(tag.id);
            }
        }

        let tag_ids: Vec<Uuid> = tag_ids.into_iter().collect();
        EntryRepository::attach_tags(&mut **tx, entry.id, &tag_ids).await?;
        tx.commit().await?;

        tracing::info!(
            entry_id = %entry.id,
            tags_assigned = tag_ids.len(),
            "Entry created through import API"
        );

        Ok(ImportedEntry {
            entry,
            tags_assigned: tag_ids.len(),
        })
    }

    /// Store an uploaded image under a unique name and record it against `entry`.
    ///
    /// The stored object is removed again when the database insert fails.
    #[tracing::instrument(skip(storage, images, entry, file), fields(entry_id = %entry.id, file.name = %file.file_name))]
    pub async fn upload_image(
        storage: &Arc<dyn Storage>,
        images: &ImageRepository,
        entry: &Entry,
        file: UploadedFile,
        is_primary: bool,
    ) -> Result<Image, AppError> {
        let ext = checked_image_extension(&file.file_name)?;
        let filename = entry.metadata().unique_filename(&ext);
        store_image(storage, images, entry, &filename, file, is_primary).await
    }
}

/// Put the bytes under `uploaded_images/{filename}` and insert the image row
pub(crate) async fn store_image(
    storage: &Arc<dyn Storage>,
    images: &ImageRepository,
    entry: &Entry,
    filename: &str,
    file: UploadedFile,
    is_primary: bool,
) -> Result<Image, AppError> {
    let size = file.data.len();
    let key = image_key(filename);
    storage
        .put(&key, file.data.to_vec())
        .await
        .map_err(storage_error)?;

    match images.add_image(entry, &key, is_primary).await {
        Ok(image) => {
            tracing::info!(
                image_id = %image.id,
                storage_key = %key,
                size = size,
                is_primary = image.is_primary,
                "Image stored"
            );
            Ok(image)
        }
        Err(e) => {
            if let Err(cleanup) = storage.delete(&key).await {
                tracing::warn!(error = %cleanup, storage_key = %key, "Failed to remove orphaned image");
            }
            Err(e)
        }
    }
}
