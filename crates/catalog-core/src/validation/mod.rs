//! Input checks shared by handlers and tools

use crate::error::AppError;
use crate::models::{FileKind, IMAGE_EXTENSIONS};
use crate::naming::extension_of;

/// `#` followed by exactly six hex digits
pub fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Lowercased extension of `filename` if `kind` accepts it
pub fn checked_extension(kind: FileKind, filename: &str) -> Result<String, AppError> {
    let ext = extension_of(filename);
    if kind.accepts(&ext) {
        Ok(ext)
    } else {
        Err(AppError::BadRequest(format!(
            "File type not allowed for {} files: {}. Allowed: {}",
            kind,
            filename,
            kind.allowed_extensions().join(", ")
        )))
    }
}

/// Lowercased extension of an entry image, rejecting anything but common image types
pub fn checked_image_extension(filename: &str) -> Result<String, AppError> {
    let ext = extension_of(filename);
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::BadRequest(format!(
            "Not an image file: {}. Allowed: {}",
            filename,
            IMAGE_EXTENSIONS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#6c757d"));
        assert!(is_hex_color("#FF5733"));
        assert!(!is_hex_color("6c757d"));
        assert!(!is_hex_color("#6c757"));
        assert!(!is_hex_color("#zzzzzz"));
    }

    #[test]
    fn test_checked_extension() {
        assert_eq!(checked_extension(FileKind::Stl, "Sample File.ZIP").unwrap(), ".zip");
        let err = checked_extension(FileKind::Stl, "not_allowed.txt").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_checked_image_extension() {
        assert_eq!(checked_image_extension("boy.JPEG").unwrap(), ".jpeg");
        assert!(checked_image_extension("boy.stl").is_err());
        assert!(checked_image_extension("boy").is_err());
    }
}
