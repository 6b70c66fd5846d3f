use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/catalog/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:8000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        // Symlinks inside the root must not lead outside it
        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(self.url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn rename(&self, from_key: &str, to_key: &str) -> StorageResult<String> {
        let from_path = self.key_to_path(from_key)?;
        let to_path = self.key_to_path(to_key)?;

        if !fs::try_exists(&from_path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(from_key.to_string()));
        }
        if fs::try_exists(&to_path).await.unwrap_or(false) {
            return Err(StorageError::AlreadyExists(to_key.to_string()));
        }

        self.ensure_parent_dir(&to_path).await?;

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            StorageError::RenameFailed(format!(
                "Failed to rename {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(
            from_key = %from_key,
            to_key = %to_key,
            "Local storage rename successful"
        );

        Ok(self.url(to_key))
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "http://localhost:8000/media".to_string())
            .await
            .unwrap()
    }

    fn read(dir: &Path, key: &str) -> Vec<u8> {
        std::fs::read(dir.join(key)).unwrap()
    }

    #[tokio::test]
    async fn test_local_storage_put() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let data = b"test data".to_vec();
        let url = storage
            .put("uploaded_images/gw_40k_boy_initial.jpg", data.clone())
            .await
            .unwrap();

        assert_eq!(
            url,
            "http://localhost:8000/media/uploaded_images/gw_40k_boy_initial.jpg"
        );
        assert_eq!(read(dir.path(), "uploaded_images/gw_40k_boy_initial.jpg"), data);
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.put("../../../etc/passwd", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.delete("../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.exists("/etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = storage.rename("a.jpg", "../b.jpg").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_local_storage_delete_nonexistent() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert!(storage.delete("nonexistent/file.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_rename_moves_file_into_new_directory() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage
            .put("stlFiles/gw/40k/boy/a.zip", b"zip".to_vec())
            .await
            .unwrap();
        let url = storage
            .rename("stlFiles/gw/40k/boy/a.zip", "stlFiles/games-workshop/40k/boy/b.zip")
            .await
            .unwrap();

        assert!(url.ends_with("stlFiles/games-workshop/40k/boy/b.zip"));
        assert!(!storage.exists("stlFiles/gw/40k/boy/a.zip").await.unwrap());
        assert_eq!(
            read(dir.path(), "stlFiles/games-workshop/40k/boy/b.zip"),
            b"zip".to_vec()
        );
    }

    #[tokio::test]
    async fn test_rename_refuses_existing_target() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        storage.put("uploaded_images/a.jpg", b"a".to_vec()).await.unwrap();
        storage.put("uploaded_images/b.jpg", b"b".to_vec()).await.unwrap();

        let result = storage
            .rename("uploaded_images/a.jpg", "uploaded_images/b.jpg")
            .await;
        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert_eq!(read(dir.path(), "uploaded_images/b.jpg"), b"b".to_vec());

        let result = storage
            .rename("uploaded_images/missing.jpg", "uploaded_images/c.jpg")
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}
