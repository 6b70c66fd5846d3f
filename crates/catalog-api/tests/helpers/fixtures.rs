//! Request payload fixtures

use axum_test::multipart::{MultipartForm, Part};

/// Smallest valid PNG (1x1 transparent pixel)
pub fn create_minimal_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

pub fn png_part(file_name: &str) -> Part {
    Part::bytes(create_minimal_png())
        .file_name(file_name.to_string())
        .mime_type("image/png")
}

/// Import API image upload form
pub fn import_image_form(entry_id: &str, file_name: &str, is_primary: bool) -> MultipartForm {
    MultipartForm::new()
        .add_text("entry_id", entry_id.to_string())
        .add_text("is_primary", if is_primary { "true" } else { "false" })
        .add_part("image", png_part(file_name))
}
