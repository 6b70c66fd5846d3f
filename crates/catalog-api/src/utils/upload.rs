//! Multipart form parsing for the upload endpoints

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;
use catalog_core::AppError;
use uuid::Uuid;

/// A file part of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side file name
    pub file_name: String,
    pub data: Bytes,
}

/// Text fields and files of a multipart form, keyed by field name.
///
/// Repeated fields keep every value in arrival order.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl MultipartForm {
    /// Read the whole form, rejecting any file larger than `max_file_size`.
    ///
    /// File inputs left empty by the browser (no name, no bytes) are skipped.
    pub async fn read(mut multipart: Multipart, max_file_size: usize) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
        {
            let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

            match field.file_name().map(|s| s.to_string()) {
                Some(file_name) => {
                    let data = field.bytes().await.map_err(|e| {
                        AppError::InvalidInput(format!("Failed to read file data: {}", e))
                    })?;
                    if file_name.is_empty() && data.is_empty() {
                        continue;
                    }
                    validate_file_size(data.len(), max_file_size)?;
                    form.files
                        .entry(field_name)
                        .or_default()
                        .push(UploadedFile { file_name, data });
                }
                None => {
                    let value = field.text().await.map_err(|e| {
                        AppError::InvalidInput(format!("Failed to read form field: {}", e))
                    })?;
                    form.fields.entry(field_name).or_default().push(value);
                }
            }
        }

        Ok(form)
    }

    /// First value of a text field, trimmed; blank counts as absent
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Every value of a repeated text field
    pub fn texts(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Checkbox-style flag: `true`, `1` and `on` are set
    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "on"))
            .unwrap_or(false)
    }

    /// Repeated id field, e.g. `tag_ids`
    pub fn uuids(&self, name: &str) -> Result<Vec<Uuid>, AppError> {
        self.texts(name)
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(|v| {
                Uuid::parse_str(v)
                    .map_err(|_| AppError::InvalidInput(format!("Invalid id in {}: {}", name, v)))
            })
            .collect()
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files
            .get_mut(name)
            .filter(|files| !files.is_empty())
            .map(|files| files.remove(0))
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }
}

/// Validate file size
pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> MultipartForm {
        let mut form = MultipartForm::default();
        form.fields
            .insert("name".to_string(), vec!["  Ork Boy ".to_string()]);
        form.fields.insert("range".to_string(), vec!["   ".to_string()]);
        form.fields
            .insert("is_primary".to_string(), vec!["True".to_string()]);
        form.files.insert(
            "images".to_string(),
            vec![
                UploadedFile {
                    file_name: "a.jpg".to_string(),
                    data: Bytes::from_static(b"a"),
                },
                UploadedFile {
                    file_name: "b.png".to_string(),
                    data: Bytes::from_static(b"b"),
                },
            ],
        );
        form
    }

    #[test]
    fn test_text_fields() {
        let form = form();
        assert_eq!(form.text("name").as_deref(), Some("Ork Boy"));
        assert_eq!(form.text("range"), None);
        assert_eq!(form.text("missing"), None);
        assert!(form.flag("is_primary"));
        assert!(!form.flag("missing"));
    }

    #[test]
    fn test_uuids() {
        let mut form = MultipartForm::default();
        let id = Uuid::new_v4();
        form.fields
            .insert("tag_ids".to_string(), vec![id.to_string(), "".to_string()]);
        assert_eq!(form.uuids("tag_ids").unwrap(), vec![id]);

        form.fields
            .insert("tag_ids".to_string(), vec!["nope".to_string()]);
        assert!(form.uuids("tag_ids").is_err());
    }

    #[test]
    fn test_take_files() {
        let mut form = form();
        let first = form.take_file("images").unwrap();
        assert_eq!(first.file_name, "a.jpg");
        assert_eq!(form.take_files("images").len(), 1);
        assert!(form.take_file("images").is_none());
    }

    #[test]
    fn test_validate_file_size() {
        assert!(validate_file_size(10, 10).is_ok());
        assert!(matches!(
            validate_file_size(11, 10),
            Err(AppError::PayloadTooLarge(_))
        ));
    }
}
