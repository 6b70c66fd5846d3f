//! Import API calls used by the bulk importer.

use crate::{ApiClient, IMPORT_PREFIX};
use anyhow::{Context, Result};
use catalog_core::models::CreateEntryRequest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportHealth {
    pub status: String,
    pub authenticated: bool,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateCheck {
    pub exists: bool,
    #[serde(default)]
    pub entry_id: Option<Uuid>,
    #[serde(default)]
    pub entry_name: Option<String>,
}

/// Tag names keyed by tag type name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagNames {
    pub tags: BTreeMap<String, Vec<String>>,
}

impl TagNames {
    pub fn contains(&self, tag_type: &str, name: &str) -> bool {
        self.tags
            .get(tag_type)
            .is_some_and(|names| names.iter().any(|n| n == name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedEntry {
    pub entry_id: Uuid,
    pub entry_name: String,
    pub tags_assigned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub image_id: Uuid,
    pub filename: String,
    pub is_primary: bool,
}

fn import_path(endpoint: &str) -> String {
    format!("{}/{}/", IMPORT_PREFIX, endpoint)
}

impl ApiClient {
    /// Verify the credentials against the import API
    pub async fn health(&self) -> Result<ImportHealth> {
        self.get(&import_path("health"), &[]).await
    }

    pub async fn check_duplicate(
        &self,
        name: &str,
        publisher: Option<&str>,
        range: Option<&str>,
    ) -> Result<DuplicateCheck> {
        let mut query = vec![("name", name)];
        if let Some(publisher) = publisher {
            query.push(("publisher", publisher));
        }
        if let Some(range) = range {
            query.push(("range", range));
        }
        self.get(&import_path("check-duplicate"), &query).await
    }

    pub async fn get_tags(&self) -> Result<TagNames> {
        self.get(&import_path("get-tags"), &[]).await
    }

    pub async fn create_entry(&self, request: &CreateEntryRequest) -> Result<CreatedEntry> {
        self.post_json(&import_path("create-entry"), request).await
    }

    /// Upload one image file for an entry
    pub async fn upload_image(
        &self,
        entry_id: Uuid,
        image_path: &Path,
        is_primary: bool,
    ) -> Result<UploadedImage> {
        let data = tokio::fs::read(image_path)
            .await
            .with_context(|| format!("Failed to read file: {}", image_path.display()))?;
        let filename = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image.jpg")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .text("entry_id", entry_id.to_string())
            .text("is_primary", if is_primary { "true" } else { "false" })
            .part(
                "image",
                reqwest::multipart::Part::bytes(data).file_name(filename),
            );

        tracing::debug!(entry_id = %entry_id, path = %image_path.display(), "Uploading image");
        self.post_multipart(&import_path("upload-image"), form).await
    }
}
