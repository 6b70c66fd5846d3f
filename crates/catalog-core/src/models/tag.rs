use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::tag_graph::{TagRef, TypeRef};
use crate::validation::is_hex_color;

/// Colour of tags without a type and of new tag types
pub const DEFAULT_TAG_COLOR: &str = "#6c757d";

/// Sort order given to tag types created on the fly by the import API
pub const DEFAULT_IMPORT_SORT_ORDER: i32 = 100;

/// Tag types the bulk importer knows, with the colour and sort order they get when
/// first created.
pub const IMPORT_TAG_TYPES: &[(&str, &str, i32)] = &[
    ("Publisher", "#3498db", 10),
    ("Faction Tag", "#e74c3c", 20),
    ("Army Role", "#2ecc71", 30),
    ("GW Alternative", "#f39c12", 40),
];

/// Colour and sort order for a tag type created through the import API
pub fn import_tag_type_defaults(name: &str) -> (&'static str, i32) {
    IMPORT_TAG_TYPES
        .iter()
        .find(|(type_name, _, _)| *type_name == name)
        .map(|(_, color, sort_order)| (*color, *sort_order))
        .unwrap_or((DEFAULT_TAG_COLOR, DEFAULT_IMPORT_SORT_ORDER))
}

/// Readable text colour (`black` or `white`) on top of a hex background
pub fn text_color_for(background: &str) -> &'static str {
    let hex = background.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .map(u32::from)
    };
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => {
            // brightness = (r*299 + g*587 + b*114) / 1000, compared without rounding
            if r * 299 + g * 587 + b * 114 > 128_000 {
                "black"
            } else {
                "white"
            }
        }
        _ => "white",
    }
}

/// Category of tags
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TagType {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub color: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub show_in_gallery: bool,
    pub set_at_upload: bool,
    pub created_at: DateTime<Utc>,
}

impl TagType {
    pub fn type_ref(&self) -> TypeRef {
        TypeRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagTypeResponse {
    #[serde(flatten)]
    pub tag_type: TagType,
    pub reference_tagtype_ids: Vec<Uuid>,
    pub tag_count: i64,
}

/// Create or replace a tag type
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct TagTypeInput {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Tag type name must be between 1 and 50 characters"
    ))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "Sort order cannot be negative"))]
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub show_in_gallery: bool,
    #[serde(default)]
    pub set_at_upload: bool,
    #[serde(default)]
    pub reference_tagtype_ids: Vec<Uuid>,
}

impl TagTypeInput {
    /// Field rules plus the colour format check
    pub fn check(&self) -> Result<(), AppError> {
        self.validate()?;
        if !is_hex_color(&self.color) {
            return Err(AppError::Validation {
                field: "color".to_string(),
                message: "Enter a hex colour such as #FF5733".to_string(),
            });
        }
        Ok(())
    }
}

fn default_color() -> String {
    DEFAULT_TAG_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

/// Tag row joined with its type's name and colour
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub tag_type_id: Option<Uuid>,
    pub tag_type_name: Option<String>,
    pub tag_type_color: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn color(&self) -> &str {
        self.tag_type_color.as_deref().unwrap_or(DEFAULT_TAG_COLOR)
    }

    pub fn text_color(&self) -> &'static str {
        match self.tag_type_color {
            Some(ref color) => text_color_for(color),
            None => "white",
        }
    }

    pub fn tag_ref(&self) -> TagRef {
        TagRef {
            id: self.id,
            name: self.name.clone(),
            tag_type: match (self.tag_type_id, &self.tag_type_name) {
                (Some(id), Some(name)) => Some(TypeRef {
                    id,
                    name: name.clone(),
                }),
                _ => None,
            },
        }
    }

    pub fn into_response(self, reference_tag_ids: Vec<Uuid>) -> TagResponse {
        TagResponse {
            color: self.color().to_string(),
            text_color: self.text_color().to_string(),
            id: self.id,
            name: self.name,
            tag_type_id: self.tag_type_id,
            tag_type_name: self.tag_type_name,
            reference_tag_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TagResponse {
    pub id: Uuid,
    pub name: String,
    pub tag_type_id: Option<Uuid>,
    pub tag_type_name: Option<String>,
    pub color: String,
    pub text_color: String,
    pub reference_tag_ids: Vec<Uuid>,
}

/// Create or replace a tag
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct TagInput {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Tag name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[serde(default)]
    pub tag_type_id: Option<Uuid>,
    #[serde(default)]
    pub reference_tag_ids: Vec<Uuid>,
}

/// Filter on an optional relation: anything, nothing set, or one id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationFilter {
    #[default]
    Any,
    Missing,
    Is(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_with_color(color: Option<&str>) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            name: "Orks".to_string(),
            tag_type_id: color.map(|_| Uuid::new_v4()),
            tag_type_name: color.map(|_| "Faction".to_string()),
            tag_type_color: color.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tag_colors() {
        let untyped = tag_with_color(None);
        assert_eq!(untyped.color(), "#6c757d");
        assert_eq!(untyped.text_color(), "white");

        assert_eq!(tag_with_color(Some("#f39c12")).text_color(), "black");
        assert_eq!(tag_with_color(Some("#e74c3c")).text_color(), "white");
        assert_eq!(tag_with_color(Some("#3498db")).text_color(), "black");
        assert_eq!(tag_with_color(Some("#ffffff")).text_color(), "black");
    }

    #[test]
    fn test_text_color_brightness_threshold() {
        // 128 exactly stays white
        assert_eq!(text_color_for("#808080"), "white");
        assert_eq!(text_color_for("#818181"), "black");
        assert_eq!(text_color_for("#808081"), "black");
        assert_eq!(text_color_for("garbage"), "white");
    }

    #[test]
    fn test_import_tag_type_defaults() {
        assert_eq!(import_tag_type_defaults("Publisher"), ("#3498db", 10));
        assert_eq!(import_tag_type_defaults("GW Alternative"), ("#f39c12", 40));
        assert_eq!(import_tag_type_defaults("Paint Scheme"), ("#6c757d", 100));
    }

    #[test]
    fn test_tag_ref_without_type() {
        let tag = tag_with_color(None);
        assert!(tag.tag_ref().tag_type.is_none());
    }
}
