//! Planning for the image rename tool.

use catalog_core::models::Image;
use catalog_core::naming::{self, DEFAULT_IMAGE_EXTENSION};

/// What the rename tool does with one image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenamePlan {
    /// The row has no stored file
    NoFile,
    /// Already named `{stem}_initial.{ext}`
    AlreadyNewFormat,
    Rename { from: String, to: String },
}

/// Decide how an image should be renamed, without touching storage
pub fn plan(image: &Image) -> RenamePlan {
    if image.file_path.trim().is_empty() {
        return RenamePlan::NoFile;
    }
    let filename = image.filename();
    if naming::is_new_format(filename) {
        return RenamePlan::AlreadyNewFormat;
    }

    let mut ext = naming::extension_of(filename);
    if ext.is_empty() {
        ext = DEFAULT_IMAGE_EXTENSION.to_string();
    }
    let to = naming::image_key(&image.metadata().initial_filename(&ext));
    if to == image.file_path {
        return RenamePlan::AlreadyNewFormat;
    }
    RenamePlan::Rename {
        from: image.file_path.clone(),
        to,
    }
}

/// A rename queued for the commit phase
#[derive(Debug, Clone)]
pub struct PendingRename {
    pub image_id: uuid::Uuid,
    pub entry_name: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenameReport {
    pub renamed: usize,
    pub skipped: usize,
    pub errors: usize,
}
