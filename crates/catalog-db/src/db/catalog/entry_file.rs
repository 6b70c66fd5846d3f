use catalog_core::{
    models::{Entry, EntryFields, EntryFile, FileKind},
    AppError,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

const FILE_COLUMNS: &str =
    "id, entry_id, kind, file_path, original_name, name, publisher, range, uploaded_by, upload_date";

/// Repository for STL archives, print files and user prints
#[derive(Clone)]
pub struct EntryFileRepository {
    pool: PgPool,
}

impl EntryFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, entry), fields(db.table = "entry_files", db.operation = "insert", db.record_id = %entry.id))]
    pub async fn insert(
        &self,
        entry: &Entry,
        kind: FileKind,
        file_path: &str,
        original_name: &str,
        uploaded_by: Option<Uuid>,
    ) -> Result<EntryFile, AppError> {
        let file = sqlx::query_as::<Postgres, EntryFile>(&format!(
            r#"
            INSERT INTO entry_files
                (id, entry_id, kind, file_path, original_name, name, publisher, range, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            FILE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(entry.id)
        .bind(kind)
        .bind(file_path)
        .bind(original_name)
        .bind(&entry.name)
        .bind(&entry.publisher)
        .bind(&entry.range)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(file)
    }

    /// Files of an entry grouped by kind, oldest first
    #[tracing::instrument(skip(self), fields(db.table = "entry_files", db.operation = "select", db.record_id = %entry_id))]
    pub async fn list_for_entry(&self, entry_id: Uuid) -> Result<Vec<EntryFile>, AppError> {
        let files = sqlx::query_as::<Postgres, EntryFile>(&format!(
            "SELECT {} FROM entry_files WHERE entry_id = $1 ORDER BY kind, upload_date ASC, id",
            FILE_COLUMNS
        ))
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(db.table = "entry_files", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, entry_id: Uuid, id: Uuid) -> Result<Option<EntryFile>, AppError> {
        let file = sqlx::query_as::<Postgres, EntryFile>(&format!(
            "DELETE FROM entry_files WHERE id = $1 AND entry_id = $2 RETURNING {}",
            FILE_COLUMNS
        ))
        .bind(id)
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    /// Copy an entry's metadata onto all of its files
    pub async fn propagate_metadata(
        conn: &mut PgConnection,
        entry_id: Uuid,
        fields: &EntryFields,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE entry_files SET name = $2, publisher = $3, range = $4 WHERE entry_id = $1",
        )
        .bind(entry_id)
        .bind(&fields.name)
        .bind(&fields.publisher)
        .bind(&fields.range)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self), fields(db.table = "entry_files", db.operation = "update", db.record_id = %id))]
    pub async fn update_path(&self, id: Uuid, file_path: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE entry_files SET file_path = $2 WHERE id = $1")
            .bind(id)
            .bind(file_path)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
