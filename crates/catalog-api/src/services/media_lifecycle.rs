//! Storage side of entry edits and deletes: renaming objects after a metadata change
//! and removing objects of deleted records.
//!
//! Keeps handler logic thin and allows unit testing without HTTP.

use catalog_core::models::{EntryFile, EntryFields, Image};
use catalog_core::naming::{extension_of, image_key, DEFAULT_IMAGE_EXTENSION};
use catalog_db::{EntryFileRepository, ImageRepository};
use catalog_storage::Storage;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

/// Concurrent storage deletes when an entry goes away
const DELETE_CONCURRENCY: usize = 16;

/// Outcome of renaming an entry's objects
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenameReport {
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Service for the storage lifecycle of entry images and files.
pub struct MediaLifecycleService;

impl MediaLifecycleService {
    /// Fresh key for an image after its entry's metadata changed
    pub fn image_target(fields: &EntryFields, image: &Image) -> String {
        let mut ext = extension_of(&image.file_path);
        if ext.is_empty() {
            ext = DEFAULT_IMAGE_EXTENSION.to_string();
        }
        image_key(&fields.metadata().unique_filename(&ext))
    }

    /// Fresh key for an entry file after its entry's metadata changed
    pub fn file_target(fields: &EntryFields, file: &EntryFile) -> String {
        let ext = extension_of(&file.file_path);
        fields.metadata().file_key(file.kind, &ext)
    }

    /// Move every stored object of an entry to a name built from `fields`.
    ///
    /// Best-effort: missing objects are skipped, failures are logged and skipped.
    pub async fn rename_entry_media(
        storage: &Arc<dyn Storage>,
        images_repo: &ImageRepository,
        files_repo: &EntryFileRepository,
        fields: &EntryFields,
        images: &[Image],
        files: &[EntryFile],
    ) -> RenameReport {
        let mut report = RenameReport::default();

        for image in images {
            let target = Self::image_target(fields, image);
            match Self::move_object(storage, &image.file_path, &target).await {
                Some(new_key) => match images_repo.update_path(image.id, &new_key).await {
                    Ok(()) => report.renamed += 1,
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            image_id = %image.id,
                            storage_key = %new_key,
                            "Renamed image but failed to store its new path"
                        );
                        report.failed += 1;
                    }
                },
                None => report.skipped += 1,
            }
        }

        for file in files {
            let target = Self::file_target(fields, file);
            match Self::move_object(storage, &file.file_path, &target).await {
                Some(new_key) => match files_repo.update_path(file.id, &new_key).await {
                    Ok(()) => report.renamed += 1,
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            file_id = %file.id,
                            storage_key = %new_key,
                            "Renamed file but failed to store its new path"
                        );
                        report.failed += 1;
                    }
                },
                None => report.skipped += 1,
            }
        }

        tracing::info!(
            renamed = report.renamed,
            skipped = report.skipped,
            failed = report.failed,
            "Entry media renamed"
        );
        report
    }

    /// Rename one object, returning the new key. `None` when the object is gone or
    /// the rename failed.
    async fn move_object(storage: &Arc<dyn Storage>, from: &str, to: &str) -> Option<String> {
        if from.is_empty() {
            return None;
        }
        match storage.exists(from).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(storage_key = %from, "Object missing, not renamed");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, storage_key = %from, "Could not check object");
                return None;
            }
        }

        match storage.rename(from, to).await {
            Ok(_) => Some(to.to_string()),
            Err(e) => {
                tracing::warn!(error = %e, from = %from, to = %to, "Failed to rename object");
                None
            }
        }
    }

    /// Delete stored objects. Best-effort: logs errors but does not fail.
    pub async fn delete_objects(storage: &Arc<dyn Storage>, keys: Vec<String>) {
        stream::iter(keys.into_iter().filter(|k| !k.is_empty()))
            .map(|key| {
                let s = storage.clone();
                async move {
                    if let Err(e) = s.delete(&key).await {
                        tracing::warn!(
                            error = %e,
                            storage_key = %key,
                            "Failed to delete object from storage"
                        );
                    }
                }
            })
            .buffer_unordered(DELETE_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::models::FileKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn fields() -> EntryFields {
        EntryFields::new(
            "Boyz Mob",
            Some("Games Workshop".to_string()),
            Some("40K".to_string()),
            None,
            None,
        )
    }

    fn image(path: &str) -> Image {
        Image {
            id: Uuid::new_v4(),
            entry_id: Uuid::new_v4(),
            file_path: path.to_string(),
            name: "Old".to_string(),
            publisher: None,
            range: None,
            is_primary: true,
            upload_date: Utc::now(),
        }
    }

    #[test]
    fn test_image_target_keeps_extension() {
        let target = MediaLifecycleService::image_target(
            &fields(),
            &image("uploaded_images/unknown_unknown_old_initial.PNG"),
        );
        assert!(target.starts_with("uploaded_images/gamesWorkshop_40k_boyzMob_"));
        assert!(target.ends_with(".png"));
    }

    #[test]
    fn test_image_target_defaults_extension() {
        let target =
            MediaLifecycleService::image_target(&fields(), &image("uploaded_images/legacy"));
        assert!(target.ends_with(".jpg"));
    }

    #[test]
    fn test_file_target_uses_kind_directory() {
        let file = EntryFile {
            id: Uuid::new_v4(),
            entry_id: Uuid::new_v4(),
            kind: FileKind::Stl,
            file_path: "stlFiles/unknown/unknown/old/old_1234abcd.zip".to_string(),
            original_name: "boyz.zip".to_string(),
            name: "Old".to_string(),
            publisher: None,
            range: None,
            uploaded_by: None,
            upload_date: Utc::now(),
        };
        let target = MediaLifecycleService::file_target(&fields(), &file);
        assert!(target.starts_with("stlFiles/games-workshop/40k/boyz-mob/gamesWorkshop_40k_boyzMob_"));
        assert!(target.ends_with(".zip"));
    }
}
