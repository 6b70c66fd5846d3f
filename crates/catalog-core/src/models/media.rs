use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::naming::{self, FileMetadata};

/// Image extensions accepted for entry images and user prints
pub const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Image attached to an entry.
///
/// `name`, `publisher` and `range` are copies of the owning entry's fields, kept in
/// sync whenever the entry is edited.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Image {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub file_path: String,
    pub name: String,
    pub publisher: Option<String>,
    pub range: Option<String>,
    pub is_primary: bool,
    pub upload_date: DateTime<Utc>,
}

impl Image {
    pub fn metadata(&self) -> FileMetadata<'_> {
        FileMetadata::new(&self.name, self.publisher.as_deref(), self.range.as_deref())
    }

    pub fn filename(&self) -> &str {
        naming::file_name(&self.file_path)
    }

    pub fn into_response(self, url: String) -> ImageResponse {
        ImageResponse {
            filename: self.filename().to_string(),
            id: self.id,
            entry_id: self.entry_id,
            name: self.name,
            file_path: self.file_path,
            url,
            is_primary: self.is_primary,
            upload_date: self.upload_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub name: String,
    pub filename: String,
    pub file_path: String,
    pub url: String,
    pub is_primary: bool,
    pub upload_date: DateTime<Utc>,
}

/// Kind of an entry-level file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Printable model archive
    Stl,
    /// Sliced file ready for a printer
    Print,
    /// Photo of a finished print
    UserPrint,
}

impl FileKind {
    pub const ALL: [FileKind; 3] = [FileKind::Stl, FileKind::Print, FileKind::UserPrint];

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileKind::Stl => &[".stl", ".zip", ".7z", ".rar", ".3mf", ".obj"],
            FileKind::Print => &[
                ".ctb", ".cbddlp", ".photon", ".pwmx", ".goo", ".lys", ".gcode", ".3mf", ".zip",
            ],
            FileKind::UserPrint => IMAGE_EXTENSIONS,
        }
    }

    /// Whether `ext` (lowercase, with leading dot) may be stored as this kind
    pub fn accepts(&self, ext: &str) -> bool {
        self.allowed_extensions().contains(&ext)
    }
}

impl FromStr for FileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stl" => Ok(FileKind::Stl),
            "print" => Ok(FileKind::Print),
            "user_print" | "user-print" => Ok(FileKind::UserPrint),
            _ => Err(anyhow::anyhow!("Invalid file kind: {}", s)),
        }
    }
}

impl Display for FileKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            FileKind::Stl => write!(f, "stl"),
            FileKind::Print => write!(f, "print"),
            FileKind::UserPrint => write!(f, "user_print"),
        }
    }
}

/// STL archive, print file or user print attached to an entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EntryFile {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub kind: FileKind,
    pub file_path: String,
    pub original_name: String,
    pub name: String,
    pub publisher: Option<String>,
    pub range: Option<String>,
    pub uploaded_by: Option<Uuid>,
    pub upload_date: DateTime<Utc>,
}

impl EntryFile {
    pub fn metadata(&self) -> FileMetadata<'_> {
        FileMetadata::new(&self.name, self.publisher.as_deref(), self.range.as_deref())
    }

    pub fn into_response(self, url: String) -> EntryFileResponse {
        EntryFileResponse {
            filename: naming::file_name(&self.file_path).to_string(),
            id: self.id,
            kind: self.kind,
            original_name: self.original_name,
            file_path: self.file_path,
            url,
            upload_date: self.upload_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EntryFileResponse {
    pub id: Uuid,
    pub kind: FileKind,
    pub filename: String,
    pub original_name: String,
    pub file_path: String,
    pub url: String,
    pub upload_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_extensions() {
        assert!(FileKind::Stl.accepts(".zip"));
        assert!(FileKind::Stl.accepts(".stl"));
        assert!(!FileKind::Stl.accepts(".txt"));
        assert!(FileKind::Print.accepts(".ctb"));
        assert!(!FileKind::Print.accepts(".png"));
        assert!(FileKind::UserPrint.accepts(".png"));
    }

    #[test]
    fn test_file_kind_parse_roundtrip() {
        for kind in FileKind::ALL {
            assert_eq!(kind.to_string().parse::<FileKind>().unwrap(), kind);
        }
        assert!("archive".parse::<FileKind>().is_err());
    }
}
