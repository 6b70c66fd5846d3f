use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::{ImageResponse, TagResponse};
use crate::naming::FileMetadata;

/// A catalogued item
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Entry {
    pub id: Uuid,
    pub name: String,
    pub publisher: Option<String>,
    pub range: Option<String>,
    pub folder_location: Option<String>,
    pub notes: Option<String>,
    pub upload_date: DateTime<Utc>,
}

impl Entry {
    pub fn metadata(&self) -> FileMetadata<'_> {
        FileMetadata::new(&self.name, self.publisher.as_deref(), self.range.as_deref())
    }
}

/// Trim a text field and treat blank input as absent
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Editable entry columns, normalised before they reach the database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    pub name: String,
    pub publisher: Option<String>,
    pub range: Option<String>,
    pub folder_location: Option<String>,
    pub notes: Option<String>,
}

impl EntryFields {
    pub fn new(
        name: impl Into<String>,
        publisher: Option<String>,
        range: Option<String>,
        folder_location: Option<String>,
        notes: Option<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            publisher: blank_to_none(publisher),
            range: blank_to_none(range),
            folder_location: blank_to_none(folder_location),
            notes: blank_to_none(notes),
        }
    }

    pub fn metadata(&self) -> FileMetadata<'_> {
        FileMetadata::new(&self.name, self.publisher.as_deref(), self.range.as_deref())
    }
}

/// Body of the import API's create-entry call
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct CreateEntryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub folder_location: Option<String>,
    /// Tag names keyed by tag type name
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
}

/// Full replacement of an entry's editable fields
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UpdateEntryRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 255, message = "Publisher must be at most 255 characters"))]
    pub publisher: Option<String>,
    #[serde(default)]
    #[validate(length(max = 255, message = "Range must be at most 255 characters"))]
    pub range: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Folder location must be at most 500 characters"))]
    pub folder_location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Replaces the entry's tags when present
    #[serde(default)]
    pub tag_ids: Option<Vec<Uuid>>,
}

impl UpdateEntryRequest {
    pub fn fields(&self) -> EntryFields {
        EntryFields::new(
            self.name.clone(),
            self.publisher.clone(),
            self.range.clone(),
            self.folder_location.clone(),
            self.notes.clone(),
        )
    }
}

/// Entry as listed in the gallery and assignment views
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntrySummary {
    #[serde(flatten)]
    pub entry: Entry,
    pub display_image: Option<ImageResponse>,
    pub tags: Vec<TagResponse>,
}

/// Gallery filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GalleryFilter {
    pub search: Option<String>,
    pub publisher: Option<String>,
    pub range: Option<String>,
    /// Entries must carry every listed tag
    pub tag_ids: Vec<Uuid>,
}

/// Filters of the bulk tag assignment view
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignFilter {
    pub search: Option<String>,
    pub publisher: Option<String>,
    pub range: Option<String>,
    pub tag_name: Option<String>,
    pub untagged_only: bool,
    pub missing_tag_type: Option<Uuid>,
}

/// Entry totals shown above the assignment view
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct TaggingStats {
    pub total: i64,
    pub untagged: i64,
    pub tagged: i64,
}

/// Landing page counters
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogStats {
    pub total_images: i64,
    pub total_tags: i64,
    pub total_publishers: i64,
    pub total_ranges: i64,
    pub latest_images: Vec<ImageResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_fields_normalise_blanks() {
        let fields = EntryFields::new(
            "  Ork Boy ",
            Some("".to_string()),
            Some("  40K ".to_string()),
            None,
            Some("   ".to_string()),
        );
        assert_eq!(fields.name, "Ork Boy");
        assert_eq!(fields.publisher, None);
        assert_eq!(fields.range.as_deref(), Some("40K"));
        assert_eq!(fields.notes, None);
        assert_eq!(fields.metadata().stem(), "unknown_40k_orkBoy");
    }

    #[test]
    fn test_create_entry_request_defaults() {
        let req: CreateEntryRequest = serde_json::from_str(r#"{"name": "Boy"}"#).unwrap();
        assert_eq!(req.name, "Boy");
        assert!(req.tags.is_empty());
        assert!(req.publisher.is_none());
    }
}
