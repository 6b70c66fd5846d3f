use catalog_core::{
    models::{AssignFilter, Entry, EntryFields, GalleryFilter, TaggingStats},
    AppError,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::contains_pattern;
use crate::db::Pagination;

const ENTRY_COLUMNS: &str = "e.id, e.name, e.publisher, e.range, e.folder_location, e.notes, e.upload_date";

const GALLERY_WHERE: &str = r#"
    ($1::text IS NULL
        OR e.name ILIKE $1 OR e.publisher ILIKE $1 OR e.range ILIKE $1
        OR EXISTS (
            SELECT 1 FROM entry_tags et JOIN tags t ON t.id = et.tag_id
            WHERE et.entry_id = e.id AND t.name ILIKE $1
        ))
    AND ($2::text IS NULL OR e.publisher ILIKE $2)
    AND ($3::text IS NULL OR e.range ILIKE $3)
    AND (cardinality($4::uuid[]) = 0 OR (
        SELECT COUNT(DISTINCT et.tag_id) FROM entry_tags et
        WHERE et.entry_id = e.id AND et.tag_id = ANY($4::uuid[])
    ) = cardinality($4::uuid[]))
"#;

const ASSIGN_WHERE: &str = r#"
    ($1::text IS NULL OR e.name ILIKE $1 OR e.publisher ILIKE $1 OR e.range ILIKE $1)
    AND ($2::text IS NULL OR e.publisher = $2)
    AND ($3::text IS NULL OR e.range = $3)
    AND ($4::text IS NULL OR EXISTS (
        SELECT 1 FROM entry_tags et JOIN tags t ON t.id = et.tag_id
        WHERE et.entry_id = e.id AND t.name = $4
    ))
    AND (NOT $5::boolean OR NOT EXISTS (
        SELECT 1 FROM entry_tags et WHERE et.entry_id = e.id
    ))
    AND ($6::uuid IS NULL OR NOT EXISTS (
        SELECT 1 FROM entry_tags et JOIN tags t ON t.id = et.tag_id
        WHERE et.entry_id = e.id AND t.tag_type_id = $6
    ))
"#;

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Repository for catalogue entries and their tag links
#[derive(Clone)]
pub struct EntryRepository {
    pool: PgPool,
}

impl EntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an entry inside an open transaction
    pub async fn insert(conn: &mut PgConnection, fields: &EntryFields) -> Result<Entry, AppError> {
        let entry = sqlx::query_as::<Postgres, Entry>(
            r#"
            INSERT INTO entries (id, name, publisher, range, folder_location, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, publisher, range, folder_location, notes, upload_date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&fields.name)
        .bind(&fields.publisher)
        .bind(&fields.range)
        .bind(&fields.folder_location)
        .bind(&fields.notes)
        .fetch_one(conn)
        .await?;

        Ok(entry)
    }

    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "insert"))]
    pub async fn create(&self, fields: &EntryFields) -> Result<Entry, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::insert(&mut conn, fields).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Entry>, AppError> {
        let entry = sqlx::query_as::<Postgres, Entry>(&format!(
            "SELECT {} FROM entries e WHERE e.id = $1",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Get an entry or fail with `Entry {id} not found`
    pub async fn require(&self, id: Uuid) -> Result<Entry, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Entry {} not found", id)))
    }

    /// Find an entry with the same name, publisher and range, ignoring case.
    ///
    /// A missing publisher or range matches an empty one.
    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "select"))]
    pub async fn find_duplicate(
        &self,
        name: &str,
        publisher: Option<&str>,
        range: Option<&str>,
    ) -> Result<Option<Entry>, AppError> {
        let entry = sqlx::query_as::<Postgres, Entry>(&format!(
            r#"
            SELECT {} FROM entries e
            WHERE LOWER(e.name) = LOWER($1)
              AND LOWER(COALESCE(e.publisher, '')) = LOWER($2)
              AND LOWER(COALESCE(e.range, '')) = LOWER($3)
            ORDER BY e.upload_date DESC
            LIMIT 1
            "#,
            ENTRY_COLUMNS
        ))
        .bind(name.trim())
        .bind(publisher.unwrap_or_default().trim())
        .bind(range.unwrap_or_default().trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Overwrite the editable columns inside an open transaction
    pub async fn update_fields(
        conn: &mut PgConnection,
        id: Uuid,
        fields: &EntryFields,
    ) -> Result<Entry, AppError> {
        let entry = sqlx::query_as::<Postgres, Entry>(
            r#"
            UPDATE entries
            SET name = $2, publisher = $3, range = $4, folder_location = $5, notes = $6
            WHERE id = $1
            RETURNING id, name, publisher, range, folder_location, notes, upload_date
            "#,
        )
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.publisher)
        .bind(&fields.range)
        .bind(&fields.folder_location)
        .bind(&fields.notes)
        .fetch_optional(conn)
        .await?;

        entry.ok_or_else(|| AppError::NotFound(format!("Entry {} not found", id)))
    }

    /// Delete an entry; images, files and tag links cascade
    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Gallery search: text matches name, publisher, range or any tag name; tags use AND
    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "select"))]
    pub async fn gallery(
        &self,
        filter: &GalleryFilter,
        page: Pagination,
    ) -> Result<(Vec<Entry>, i64), AppError> {
        let search = non_empty(&filter.search).map(contains_pattern);
        let publisher = non_empty(&filter.publisher).map(contains_pattern);
        let range = non_empty(&filter.range).map(contains_pattern);
        let mut tag_ids = filter.tag_ids.clone();
        tag_ids.sort();
        tag_ids.dedup();

        let total = sqlx::query_scalar::<Postgres, i64>(&format!(
            "SELECT COUNT(*) FROM entries e WHERE {}",
            GALLERY_WHERE
        ))
        .bind(&search)
        .bind(&publisher)
        .bind(&range)
        .bind(&tag_ids)
        .fetch_one(&self.pool)
        .await?;

        let entries = sqlx::query_as::<Postgres, Entry>(&format!(
            "SELECT {} FROM entries e WHERE {} ORDER BY e.upload_date DESC, e.id LIMIT $5 OFFSET $6",
            ENTRY_COLUMNS, GALLERY_WHERE
        ))
        .bind(&search)
        .bind(&publisher)
        .bind(&range)
        .bind(&tag_ids)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((entries, total))
    }

    /// Entries for the bulk tag assignment view
    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "select"))]
    pub async fn assign_list(
        &self,
        filter: &AssignFilter,
        page: Pagination,
    ) -> Result<(Vec<Entry>, i64), AppError> {
        let search = non_empty(&filter.search).map(contains_pattern);
        let publisher = non_empty(&filter.publisher);
        let range = non_empty(&filter.range);
        let tag_name = non_empty(&filter.tag_name);

        let total = sqlx::query_scalar::<Postgres, i64>(&format!(
            "SELECT COUNT(*) FROM entries e WHERE {}",
            ASSIGN_WHERE
        ))
        .bind(&search)
        .bind(publisher)
        .bind(range)
        .bind(tag_name)
        .bind(filter.untagged_only)
        .bind(filter.missing_tag_type)
        .fetch_one(&self.pool)
        .await?;

        let entries = sqlx::query_as::<Postgres, Entry>(&format!(
            "SELECT {} FROM entries e WHERE {} ORDER BY e.upload_date DESC, e.id LIMIT $7 OFFSET $8",
            ENTRY_COLUMNS, ASSIGN_WHERE
        ))
        .bind(&search)
        .bind(publisher)
        .bind(range)
        .bind(tag_name)
        .bind(filter.untagged_only)
        .bind(filter.missing_tag_type)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((entries, total))
    }

    /// Up to six entries sharing the publisher or the range
    #[tracing::instrument(skip(self, entry), fields(db.table = "entries", db.operation = "select", db.record_id = %entry.id))]
    pub async fn related(&self, entry: &Entry) -> Result<Vec<Entry>, AppError> {
        let entries = sqlx::query_as::<Postgres, Entry>(&format!(
            r#"
            SELECT {} FROM entries e
            WHERE e.id <> $1
              AND (e.publisher IS NOT DISTINCT FROM $2 OR e.range IS NOT DISTINCT FROM $3)
            ORDER BY e.upload_date DESC
            LIMIT 6
            "#,
            ENTRY_COLUMNS
        ))
        .bind(entry.id)
        .bind(&entry.publisher)
        .bind(&entry.range)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Sorted distinct non-empty publishers
    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "select"))]
    pub async fn distinct_publishers(&self) -> Result<Vec<String>, AppError> {
        let values = sqlx::query_scalar::<Postgres, String>(
            "SELECT DISTINCT publisher FROM entries WHERE publisher IS NOT NULL AND publisher <> '' ORDER BY publisher",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(values)
    }

    /// Sorted distinct non-empty ranges
    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "select"))]
    pub async fn distinct_ranges(&self) -> Result<Vec<String>, AppError> {
        let values = sqlx::query_scalar::<Postgres, String>(
            "SELECT DISTINCT range FROM entries WHERE range IS NOT NULL AND range <> '' ORDER BY range",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(values)
    }

    #[tracing::instrument(skip(self), fields(db.table = "entries", db.operation = "select"))]
    pub async fn tagging_stats(&self) -> Result<TaggingStats, AppError> {
        let (total, untagged) = sqlx::query_as::<Postgres, (i64, i64)>(
            r#"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE NOT EXISTS (
                    SELECT 1 FROM entry_tags et WHERE et.entry_id = e.id
                ))
            FROM entries e
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TaggingStats {
            total,
            untagged,
            tagged: total - untagged,
        })
    }

    /// Attach tags inside an open transaction, returning how many links were new
    pub async fn attach_tags(
        conn: &mut PgConnection,
        entry_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<u64, AppError> {
        if tag_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO entry_tags (entry_id, tag_id)
            SELECT $1, tag_id FROM UNNEST($2::uuid[]) AS tag_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(entry_id)
        .bind(tag_ids)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, tag_ids), fields(db.table = "entry_tags", db.operation = "insert", db.record_id = %entry_id))]
    pub async fn add_tags(&self, entry_id: Uuid, tag_ids: &[Uuid]) -> Result<u64, AppError> {
        let mut conn = self.pool.acquire().await?;
        Self::attach_tags(&mut conn, entry_id, tag_ids).await
    }

    #[tracing::instrument(skip(self, tag_ids), fields(db.table = "entry_tags", db.operation = "delete", db.record_id = %entry_id))]
    pub async fn remove_tags(&self, entry_id: Uuid, tag_ids: &[Uuid]) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM entry_tags WHERE entry_id = $1 AND tag_id = ANY($2)")
            .bind(entry_id)
            .bind(tag_ids)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Replace the full tag set inside an open transaction
    pub async fn replace_tags(
        conn: &mut PgConnection,
        entry_id: Uuid,
        tag_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM entry_tags WHERE entry_id = $1")
            .bind(entry_id)
            .execute(&mut *conn)
            .await?;
        Self::attach_tags(conn, entry_id, tag_ids).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "entry_tags", db.operation = "select"))]
    pub async fn has_tag(&self, entry_id: Uuid, tag_id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM entry_tags WHERE entry_id = $1 AND tag_id = $2)",
        )
        .bind(entry_id)
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip(self), fields(db.table = "entry_tags", db.operation = "select"))]
    pub async fn tag_count(&self, entry_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM entry_tags WHERE entry_id = $1",
        )
        .bind(entry_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Ids among `ids` that exist
    #[tracing::instrument(skip(self, ids), fields(db.table = "entries", db.operation = "select"))]
    pub async fn existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, AppError> {
        let found = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT id FROM entries WHERE id = ANY($1) ORDER BY upload_date DESC",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(found)
    }
}
