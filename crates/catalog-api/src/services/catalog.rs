//! Entry management: the upload flow, media attachments, edits and deletes

use std::collections::HashMap;

use catalog_core::models::{
    Entry, EntryFields, EntryFile, EntryFileResponse, EntrySummary, FileKind, Image,
    ImageResponse, Tag, TagResponse,
};
use catalog_core::validation::{checked_extension, checked_image_extension};
use catalog_core::AppError;
use catalog_db::{EntryFileRepository, EntryRepository, ImageRepository, TransactionGuard};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::storage_error;
use crate::services::import::store_image;
use crate::services::media_lifecycle::MediaLifecycleService;
use crate::state::{DbState, MediaConfig};
use crate::utils::upload::UploadedFile;

/// Everything shown on an entry's page
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: Entry,
    pub tags: Vec<TagResponse>,
    pub images: Vec<ImageResponse>,
    pub display_image: Option<ImageResponse>,
    pub stl_files: Vec<EntryFileResponse>,
    pub print_files: Vec<EntryFileResponse>,
    pub user_prints: Vec<EntryFileResponse>,
    pub related: Vec<EntrySummary>,
}

pub struct EntryService;

impl EntryService {
    /// Tag responses with each tag's reference ids filled in
    pub async fn tag_responses(db: &DbState, tags: Vec<Tag>) -> Result<Vec<TagResponse>, AppError> {
        let ids: Vec<Uuid> = tags.iter().map(|t| t.id).collect();
        let mut references = db.tags.reference_map(&ids).await?;
        Ok(tags
            .into_iter()
            .map(|t| {
                let refs = references.remove(&t.id).unwrap_or_default();
                t.into_response(refs)
            })
            .collect())
    }

    /// Gallery cards: display image and tags for each entry, order kept
    pub async fn summaries(
        db: &DbState,
        media: &MediaConfig,
        entries: Vec<Entry>,
    ) -> Result<Vec<EntrySummary>, AppError> {
        let ids: Vec<Uuid> = entries.iter().map(|e| e.id).collect();

        let mut display: HashMap<Uuid, Image> = db
            .images
            .display_images(&ids)
            .await?
            .into_iter()
            .map(|img| (img.entry_id, img))
            .collect();
        let mut tags = db.tags.tags_for_entries(&ids).await?;

        let tag_ids: Vec<Uuid> = tags.values().flatten().map(|t| t.id).collect();
        let references = db.tags.reference_map(&tag_ids).await?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let display_image = display.remove(&entry.id).map(|img| {
                    let url = media.url(&img.file_path);
                    img.into_response(url)
                });
                let tags = tags
                    .remove(&entry.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| {
                        let refs = references.get(&t.id).cloned().unwrap_or_default();
                        t.into_response(refs)
                    })
                    .collect();
                EntrySummary {
                    entry,
                    display_image,
                    tags,
                }
            })
            .collect())
    }

    #[tracing::instrument(skip(db, media))]
    pub async fn detail(db: &DbState, media: &MediaConfig, id: Uuid) -> Result<EntryDetail, AppError> {
        let entry = db.entries.require(id).await?;

        let tags = Self::tag_responses(db, db.tags.tags_for_entry(id).await?).await?;

        let images: Vec<ImageResponse> = db
            .images
            .list_for_entry(id)
            .await?
            .into_iter()
            .map(|img| {
                let url = media.url(&img.file_path);
                img.into_response(url)
            })
            .collect();
        // primary first, else the oldest
        let display_image = images.first().cloned();

        let mut stl_files = Vec::new();
        let mut print_files = Vec::new();
        let mut user_prints = Vec::new();
        for file in db.files.list_for_entry(id).await? {
            let kind = file.kind;
            let url = media.url(&file.file_path);
            let response = file.into_response(url);
            match kind {
                FileKind::Stl => stl_files.push(response),
                FileKind::Print => print_files.push(response),
                FileKind::UserPrint => user_prints.push(response),
            }
        }

        let related = db.entries.related(&entry).await?;
        let related = Self::summaries(db, media, related).await?;

        Ok(EntryDetail {
            entry,
            tags,
            images,
            display_image,
            stl_files,
            print_files,
            user_prints,
            related,
        })
    }

    /// Only the ids that name existing tags
    async fn known_tags(db: &DbState, tag_ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(db.tags.get_many(tag_ids).await?.into_iter().map(|t| t.id).collect())
    }

    /// Upload flow: create the entry with its tags, then store its first image under
    /// the `_initial` name as primary.
    #[tracing::instrument(skip(db, media, fields, tag_ids, image), fields(entry.name = %fields.name))]
    pub async fn create_from_upload(
        db: &DbState,
        media: &MediaConfig,
        fields: EntryFields,
        tag_ids: &[Uuid],
        image: UploadedFile,
    ) -> Result<(Entry, Image), AppError> {
        if fields.name.is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }
        if fields.name.chars().count() > 255 {
            return Err(AppError::Validation {
                field: "name".to_string(),
                message: "Name must be between 1 and 255 characters".to_string(),
            });
        }
        let ext = checked_image_extension(&image.file_name)?;
        let tag_ids = Self::known_tags(db, tag_ids).await?;

        let mut tx = TransactionGuard::begin(&db.pool).await?;
        let entry = EntryRepository::insert(&mut **tx, &fields).await?;
        EntryRepository::attach_tags(&mut **tx, entry.id, &tag_ids).await?;
        tx.commit().await?;

        let filename = entry.metadata().initial_filename(&ext);
        let image = store_image(&media.storage, &db.images, &entry, &filename, image, true).await?;

        tracing::info!(entry_id = %entry.id, image_id = %image.id, "Entry uploaded");
        Ok((entry, image))
    }

    /// Attach more images. The first image of an entry without images becomes primary.
    #[tracing::instrument(skip(db, media, files), fields(count = files.len()))]
    pub async fn add_images(
        db: &DbState,
        media: &MediaConfig,
        entry_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Image>, AppError> {
        if files.is_empty() {
            return Err(AppError::BadRequest("At least one image is required".to_string()));
        }
        let entry = db.entries.require(entry_id).await?;

        let mut checked = Vec::with_capacity(files.len());
        for file in files {
            let ext = checked_image_extension(&file.file_name)?;
            checked.push((ext, file));
        }

        let mut images = Vec::with_capacity(checked.len());
        for (ext, file) in checked {
            let filename = entry.metadata().unique_filename(&ext);
            images.push(store_image(&media.storage, &db.images, &entry, &filename, file, false).await?);
        }
        Ok(images)
    }

    /// Attach STL archives, print files or user prints
    #[tracing::instrument(skip(db, media, files), fields(count = files.len()))]
    pub async fn add_files(
        db: &DbState,
        media: &MediaConfig,
        entry_id: Uuid,
        kind: FileKind,
        files: Vec<UploadedFile>,
        uploaded_by: Option<Uuid>,
    ) -> Result<Vec<EntryFile>, AppError> {
        if files.is_empty() {
            return Err(AppError::BadRequest("At least one file is required".to_string()));
        }
        let entry = db.entries.require(entry_id).await?;

        let mut checked = Vec::with_capacity(files.len());
        for file in files {
            let ext = checked_extension(kind, &file.file_name)?;
            checked.push((ext, file));
        }

        let mut stored = Vec::with_capacity(checked.len());
        for (ext, file) in checked {
            let key = entry.metadata().file_key(kind, &ext);
            media
                .storage
                .put(&key, file.data.to_vec())
                .await
                .map_err(storage_error)?;

            match db
                .files
                .insert(&entry, kind, &key, &file.file_name, uploaded_by)
                .await
            {
                Ok(record) => stored.push(record),
                Err(e) => {
                    MediaLifecycleService::delete_objects(&media.storage, vec![key]).await;
                    return Err(e);
                }
            }
        }

        tracing::info!(entry_id = %entry.id, kind = %kind, count = stored.len(), "Entry files stored");
        Ok(stored)
    }

    /// Save new field values, copy name/publisher/range onto every image and file, then
    /// rename stored objects when any of those three changed.
    #[tracing::instrument(skip(db, media, fields, tag_ids))]
    pub async fn update_entry(
        db: &DbState,
        media: &MediaConfig,
        id: Uuid,
        fields: EntryFields,
        tag_ids: Option<&[Uuid]>,
    ) -> Result<Entry, AppError> {
        let before = db.entries.require(id).await?;
        let tag_ids = match tag_ids {
            Some(ids) => Some(Self::known_tags(db, ids).await?),
            None => None,
        };

        let mut tx = TransactionGuard::begin(&db.pool).await?;
        let entry = EntryRepository::update_fields(&mut **tx, id, &fields).await?;
        ImageRepository::propagate_metadata(&mut **tx, id, &fields).await?;
        EntryFileRepository::propagate_metadata(&mut **tx, id, &fields).await?;
        if let Some(ref tag_ids) = tag_ids {
            EntryRepository::replace_tags(&mut **tx, id, tag_ids).await?;
        }
        tx.commit().await?;

        let renamed = before.name != entry.name
            || before.publisher != entry.publisher
            || before.range != entry.range;
        if renamed {
            let images = db.images.list_for_entry(id).await?;
            let files = db.files.list_for_entry(id).await?;
            MediaLifecycleService::rename_entry_media(
                &media.storage,
                &db.images,
                &db.files,
                &fields,
                &images,
                &files,
            )
            .await;
        }

        Ok(entry)
    }

    /// Delete the entry row (images, files and tag links cascade), then its stored
    /// objects. Storage errors are logged and ignored.
    #[tracing::instrument(skip(db, media))]
    pub async fn delete_entry(db: &DbState, media: &MediaConfig, id: Uuid) -> Result<(), AppError> {
        db.entries.require(id).await?;
        let mut keys: Vec<String> = db
            .images
            .list_for_entry(id)
            .await?
            .into_iter()
            .map(|img| img.file_path)
            .collect();
        keys.extend(
            db.files
                .list_for_entry(id)
                .await?
                .into_iter()
                .map(|f| f.file_path),
        );

        if !db.entries.delete(id).await? {
            return Err(AppError::NotFound(format!("Entry {} not found", id)));
        }
        MediaLifecycleService::delete_objects(&media.storage, keys).await;

        tracing::info!(entry_id = %id, "Entry deleted");
        Ok(())
    }

    /// Remove one image. The only image of an entry cannot be removed.
    pub async fn delete_image(
        db: &DbState,
        media: &MediaConfig,
        entry_id: Uuid,
        image_id: Uuid,
    ) -> Result<Image, AppError> {
        db.entries.require(entry_id).await?;
        let removed = db.images.delete_image(entry_id, image_id).await?;
        MediaLifecycleService::delete_objects(&media.storage, vec![removed.file_path.clone()]).await;
        Ok(removed)
    }

    pub async fn delete_file(
        db: &DbState,
        media: &MediaConfig,
        entry_id: Uuid,
        file_id: Uuid,
    ) -> Result<EntryFile, AppError> {
        let removed = db
            .files
            .delete(entry_id, file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;
        MediaLifecycleService::delete_objects(&media.storage, vec![removed.file_path.clone()]).await;
        Ok(removed)
    }
}
