use std::collections::HashMap;

use catalog_core::{
    models::{RelationFilter, Tag, TagInput},
    AppError,
};
use sqlx::{FromRow, PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::TransactionGuard;

const TAG_SELECT: &str = r#"
    SELECT t.id, t.name, t.tag_type_id, tt.name AS tag_type_name,
           tt.color AS tag_type_color, t.created_at
    FROM tags t
    LEFT JOIN tag_types tt ON tt.id = t.tag_type_id
"#;

const TAG_ORDER: &str = "ORDER BY tt.sort_order, tt.name, t.name";

#[derive(FromRow)]
struct EntryTagRow {
    entry_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

/// `(missing, id)` bind values for a relation filter
fn relation_params(filter: RelationFilter) -> (bool, Option<Uuid>) {
    match filter {
        RelationFilter::Any => (false, None),
        RelationFilter::Missing => (true, None),
        RelationFilter::Is(id) => (false, Some(id)),
    }
}

/// Repository for tags and tag-to-tag references
#[derive(Clone)]
pub struct TagRepository {
    pool: PgPool,
}

impl TagRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Tags filtered by type and by reference tag
    #[tracing::instrument(skip(self), fields(db.table = "tags", db.operation = "select"))]
    pub async fn list(
        &self,
        tag_type: RelationFilter,
        reference_tag: RelationFilter,
    ) -> Result<Vec<Tag>, AppError> {
        let (type_missing, type_id) = relation_params(tag_type);
        let (ref_missing, ref_id) = relation_params(reference_tag);

        let tags = sqlx::query_as::<Postgres, Tag>(&format!(
            r#"
            {}
            WHERE (NOT $1::boolean OR t.tag_type_id IS NULL)
              AND ($2::uuid IS NULL OR t.tag_type_id = $2)
              AND (NOT $3::boolean OR NOT EXISTS (
                  SELECT 1 FROM tag_references r WHERE r.tag_id = t.id
              ))
              AND ($4::uuid IS NULL OR EXISTS (
                  SELECT 1 FROM tag_references r WHERE r.tag_id = t.id AND r.reference_tag_id = $4
              ))
            {}
            "#,
            TAG_SELECT, TAG_ORDER
        ))
        .bind(type_missing)
        .bind(type_id)
        .bind(ref_missing)
        .bind(ref_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tags", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Tag>, AppError> {
        let tag = sqlx::query_as::<Postgres, Tag>(&format!("{} WHERE t.id = $1", TAG_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tag)
    }

    pub async fn require(&self, id: Uuid) -> Result<Tag, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "tags", db.operation = "select"))]
    pub async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<Tag>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let tags = sqlx::query_as::<Postgres, Tag>(&format!(
            "{} WHERE t.id = ANY($1) {}",
            TAG_SELECT, TAG_ORDER
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    /// Tags of every type whose `set_at_upload` flag is on
    #[tracing::instrument(skip(self), fields(db.table = "tags", db.operation = "select"))]
    pub async fn upload_tags(&self) -> Result<Vec<Tag>, AppError> {
        let tags = sqlx::query_as::<Postgres, Tag>(&format!(
            "{} WHERE tt.set_at_upload AND tt.is_active {}",
            TAG_SELECT, TAG_ORDER
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tags", db.operation = "select"))]
    pub async fn count(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM tags")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tag_references", db.operation = "select", db.record_id = %id))]
    pub async fn reference_ids(&self, id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT reference_tag_id FROM tag_references WHERE tag_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// `(tag, reference tag)` pairs for the given tags
    #[tracing::instrument(skip(self, tag_ids), fields(db.table = "tag_references", db.operation = "select"))]
    pub async fn reference_edges(&self, tag_ids: &[Uuid]) -> Result<Vec<(Uuid, Uuid)>, AppError> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let edges = sqlx::query_as::<Postgres, (Uuid, Uuid)>(
            "SELECT tag_id, reference_tag_id FROM tag_references WHERE tag_id = ANY($1)",
        )
        .bind(tag_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(edges)
    }

    /// Reference tag ids keyed by tag
    pub async fn reference_map(&self, tag_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, AppError> {
        let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (from, to) in self.reference_edges(tag_ids).await? {
            map.entry(from).or_default().push(to);
        }
        Ok(map)
    }

    async fn replace_references(
        conn: &mut PgConnection,
        id: Uuid,
        reference_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tag_references WHERE tag_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if !reference_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO tag_references (tag_id, reference_tag_id)
                SELECT $1, ref_id FROM UNNEST($2::uuid[]) AS ref_id
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id)
            .bind(reference_ids)
            .execute(conn)
            .await?;
        }

        Ok(())
    }

    async fn fetch_in(conn: &mut PgConnection, id: Uuid) -> Result<Tag, AppError> {
        let tag = sqlx::query_as::<Postgres, Tag>(&format!("{} WHERE t.id = $1", TAG_SELECT))
            .bind(id)
            .fetch_one(conn)
            .await?;
        Ok(tag)
    }

    /// Insert a tag with its references. Reference rules must already be checked.
    #[tracing::instrument(skip(self, input), fields(db.table = "tags", db.operation = "insert"))]
    pub async fn create(&self, input: &TagInput) -> Result<Tag, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let id = Uuid::new_v4();

        sqlx::query("INSERT INTO tags (id, name, tag_type_id) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(input.name.trim())
            .bind(input.tag_type_id)
            .execute(&mut **tx)
            .await?;
        Self::replace_references(&mut **tx, id, &input.reference_tag_ids).await?;
        let tag = Self::fetch_in(&mut **tx, id).await?;

        tx.commit().await?;
        Ok(tag)
    }

    #[tracing::instrument(skip(self, input), fields(db.table = "tags", db.operation = "update", db.record_id = %id))]
    pub async fn update(&self, id: Uuid, input: &TagInput) -> Result<Tag, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let result = sqlx::query("UPDATE tags SET name = $2, tag_type_id = $3 WHERE id = $1")
            .bind(id)
            .bind(input.name.trim())
            .bind(input.tag_type_id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Tag {} not found", id)));
        }

        Self::replace_references(&mut **tx, id, &input.reference_tag_ids).await?;
        let tag = Self::fetch_in(&mut **tx, id).await?;

        tx.commit().await?;
        Ok(tag)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tags", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Look up a tag by name, creating it under `tag_type_id` when missing.
    ///
    /// An existing tag keeps whatever type it already has.
    pub async fn get_or_create_in(
        conn: &mut PgConnection,
        name: &str,
        tag_type_id: Uuid,
    ) -> Result<Tag, AppError> {
        sqlx::query(
            "INSERT INTO tags (id, name, tag_type_id) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(tag_type_id)
        .execute(&mut *conn)
        .await?;

        let tag = sqlx::query_as::<Postgres, Tag>(&format!("{} WHERE t.name = $1", TAG_SELECT))
            .bind(name)
            .fetch_one(conn)
            .await?;

        Ok(tag)
    }

    /// Tags of one entry in display order
    #[tracing::instrument(skip(self), fields(db.table = "entry_tags", db.operation = "select", db.record_id = %entry_id))]
    pub async fn tags_for_entry(&self, entry_id: Uuid) -> Result<Vec<Tag>, AppError> {
        let tags = sqlx::query_as::<Postgres, Tag>(&format!(
            "{} JOIN entry_tags et ON et.tag_id = t.id WHERE et.entry_id = $1 {}",
            TAG_SELECT, TAG_ORDER
        ))
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }

    /// Tags of several entries, keyed by entry
    #[tracing::instrument(skip(self, entry_ids), fields(db.table = "entry_tags", db.operation = "select"))]
    pub async fn tags_for_entries(
        &self,
        entry_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<Tag>>, AppError> {
        if entry_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<Postgres, EntryTagRow>(
            r#"
            SELECT et.entry_id, t.id, t.name, t.tag_type_id, tt.name AS tag_type_name,
                   tt.color AS tag_type_color, t.created_at
            FROM entry_tags et
            JOIN tags t ON t.id = et.tag_id
            LEFT JOIN tag_types tt ON tt.id = t.tag_type_id
            WHERE et.entry_id = ANY($1)
            ORDER BY tt.sort_order, tt.name, t.name
            "#,
        )
        .bind(entry_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in rows {
            grouped.entry(row.entry_id).or_default().push(row.tag);
        }
        Ok(grouped)
    }
}
