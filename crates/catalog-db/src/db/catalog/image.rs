use catalog_core::{
    models::{Entry, EntryFields, Image},
    AppError,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::TransactionGuard;

const IMAGE_COLUMNS: &str = "id, entry_id, file_path, name, publisher, range, is_primary, upload_date";

/// Repository for entry images
#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a stored image against an entry.
    ///
    /// The entry row is locked for the duration so concurrent uploads agree on which
    /// image is first. The first image is always primary; asking for primary on a later
    /// image moves the flag.
    #[tracing::instrument(skip(self, entry), fields(db.table = "images", db.operation = "insert", db.record_id = %entry.id))]
    pub async fn add_image(
        &self,
        entry: &Entry,
        file_path: &str,
        requested_primary: bool,
    ) -> Result<Image, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let locked = sqlx::query_scalar::<Postgres, Uuid>("SELECT id FROM entries WHERE id = $1 FOR UPDATE")
            .bind(entry.id)
            .fetch_optional(&mut **tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Entry {} not found", entry.id)));
        }

        let existing = Self::count_for_entry(&mut **tx, entry.id).await?;
        let is_primary = existing == 0 || requested_primary;
        if is_primary && existing > 0 {
            Self::clear_primary(&mut **tx, entry.id).await?;
        }

        let image = sqlx::query_as::<Postgres, Image>(&format!(
            r#"
            INSERT INTO images (id, entry_id, file_path, name, publisher, range, is_primary)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            IMAGE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(entry.id)
        .bind(file_path)
        .bind(&entry.name)
        .bind(&entry.publisher)
        .bind(&entry.range)
        .bind(is_primary)
        .fetch_one(&mut **tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(image_id = %image.id, is_primary, "Image recorded");
        Ok(image)
    }

    async fn count_for_entry(conn: &mut PgConnection, entry_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM images WHERE entry_id = $1")
            .bind(entry_id)
            .fetch_one(conn)
            .await?;
        Ok(count)
    }

    async fn clear_primary(conn: &mut PgConnection, entry_id: Uuid) -> Result<(), AppError> {
        sqlx::query("UPDATE images SET is_primary = FALSE WHERE entry_id = $1 AND is_primary")
            .bind(entry_id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Images of an entry, primary first then oldest first
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %entry_id))]
    pub async fn list_for_entry(&self, entry_id: Uuid) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<Postgres, Image>(&format!(
            "SELECT {} FROM images WHERE entry_id = $1 ORDER BY is_primary DESC, upload_date ASC, id",
            IMAGE_COLUMNS
        ))
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, entry_id: Uuid, id: Uuid) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<Postgres, Image>(&format!(
            "SELECT {} FROM images WHERE id = $1 AND entry_id = $2",
            IMAGE_COLUMNS
        ))
        .bind(id)
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    /// The image to show for each entry: the primary one, otherwise the oldest
    #[tracing::instrument(skip(self, entry_ids), fields(db.table = "images", db.operation = "select"))]
    pub async fn display_images(&self, entry_ids: &[Uuid]) -> Result<Vec<Image>, AppError> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let images = sqlx::query_as::<Postgres, Image>(&format!(
            r#"
            SELECT DISTINCT ON (entry_id) {}
            FROM images
            WHERE entry_id = ANY($1)
            ORDER BY entry_id, is_primary DESC, upload_date ASC, id
            "#,
            IMAGE_COLUMNS
        ))
        .bind(entry_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    /// Make one image the entry's primary image
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    pub async fn set_primary(&self, entry_id: Uuid, id: Uuid) -> Result<Image, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        Self::clear_primary(&mut **tx, entry_id).await?;
        let image = sqlx::query_as::<Postgres, Image>(&format!(
            "UPDATE images SET is_primary = TRUE WHERE id = $1 AND entry_id = $2 RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(id)
        .bind(entry_id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(image) = image else {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Image {} not found", id)));
        };

        tx.commit().await?;
        Ok(image)
    }

    /// Remove an image row. The last image of an entry cannot be removed; removing the
    /// primary image promotes the oldest remaining one.
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_image(&self, entry_id: Uuid, id: Uuid) -> Result<Image, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        sqlx::query("SELECT id FROM entries WHERE id = $1 FOR UPDATE")
            .bind(entry_id)
            .execute(&mut **tx)
            .await?;

        let removed = sqlx::query_as::<Postgres, Image>(&format!(
            "DELETE FROM images WHERE id = $1 AND entry_id = $2 RETURNING {}",
            IMAGE_COLUMNS
        ))
        .bind(id)
        .bind(entry_id)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(removed) = removed else {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Image {} not found", id)));
        };

        if Self::count_for_entry(&mut **tx, entry_id).await? == 0 {
            tx.rollback().await?;
            return Err(AppError::BadRequest(
                "Cannot delete the only image of an entry".to_string(),
            ));
        }

        if removed.is_primary {
            sqlx::query(
                r#"
                UPDATE images SET is_primary = TRUE
                WHERE id = (
                    SELECT id FROM images WHERE entry_id = $1
                    ORDER BY upload_date ASC, id LIMIT 1
                )
                "#,
            )
            .bind(entry_id)
            .execute(&mut **tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    /// Copy an entry's metadata onto all of its images
    pub async fn propagate_metadata(
        conn: &mut PgConnection,
        entry_id: Uuid,
        fields: &EntryFields,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE images SET name = $2, publisher = $3, range = $4 WHERE entry_id = $1",
        )
        .bind(entry_id)
        .bind(&fields.name)
        .bind(&fields.publisher)
        .bind(&fields.range)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "update", db.record_id = %id))]
    pub async fn update_path(&self, id: Uuid, file_path: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE images SET file_path = $2 WHERE id = $1")
            .bind(id)
            .bind(file_path)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Every image, oldest first
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn list_all(&self) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<Postgres, Image>(&format!(
            "SELECT {} FROM images ORDER BY upload_date ASC, id",
            IMAGE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Most recent uploads
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn latest(&self, limit: i64) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<Postgres, Image>(&format!(
            "SELECT {} FROM images ORDER BY upload_date DESC, id LIMIT $1",
            IMAGE_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    /// Distinct non-empty publishers and ranges across images
    #[tracing::instrument(skip(self), fields(db.table = "images", db.operation = "select"))]
    pub async fn distinct_counts(&self) -> Result<(i64, i64), AppError> {
        let counts = sqlx::query_as::<Postgres, (i64, i64)>(
            r#"
            SELECT
                COUNT(DISTINCT publisher) FILTER (WHERE publisher <> ''),
                COUNT(DISTINCT range) FILTER (WHERE range <> '')
            FROM images
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }
}
