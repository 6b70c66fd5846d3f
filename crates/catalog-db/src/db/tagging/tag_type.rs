use std::collections::HashMap;

use catalog_core::{
    models::{import_tag_type_defaults, TagType, TagTypeInput, TagTypeResponse},
    AppError,
};
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::TransactionGuard;

const TAG_TYPE_COLUMNS: &str =
    "id, name, description, color, sort_order, is_active, show_in_gallery, set_at_upload, created_at";

/// Repository for tag types and their reference types
#[derive(Clone)]
pub struct TagTypeRepository {
    pool: PgPool,
}

impl TagTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All tag types by sort order then name
    #[tracing::instrument(skip(self), fields(db.table = "tag_types", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<TagType>, AppError> {
        let types = sqlx::query_as::<Postgres, TagType>(&format!(
            "SELECT {} FROM tag_types ORDER BY sort_order, name",
            TAG_TYPE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    /// All tag types with reference type ids and tag counts
    #[tracing::instrument(skip(self), fields(db.table = "tag_types", db.operation = "select"))]
    pub async fn list_detailed(&self) -> Result<Vec<TagTypeResponse>, AppError> {
        let types = self.list().await?;

        let edges = sqlx::query_as::<Postgres, (Uuid, Uuid)>(
            "SELECT tag_type_id, reference_tag_type_id FROM tag_type_references",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut references: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (from, to) in edges {
            references.entry(from).or_default().push(to);
        }

        let counts: HashMap<Uuid, i64> = sqlx::query_as::<Postgres, (Uuid, i64)>(
            "SELECT tag_type_id, COUNT(*) FROM tags WHERE tag_type_id IS NOT NULL GROUP BY tag_type_id",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .collect();

        Ok(types
            .into_iter()
            .map(|tag_type| TagTypeResponse {
                reference_tagtype_ids: references.remove(&tag_type.id).unwrap_or_default(),
                tag_count: counts.get(&tag_type.id).copied().unwrap_or(0),
                tag_type,
            })
            .collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "tag_types", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<TagType>, AppError> {
        let tag_type = sqlx::query_as::<Postgres, TagType>(&format!(
            "SELECT {} FROM tag_types WHERE id = $1",
            TAG_TYPE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tag_type)
    }

    pub async fn require(&self, id: Uuid) -> Result<TagType, AppError> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag type {} not found", id)))
    }

    /// A tag type with its reference ids and tag count
    pub async fn get_detailed(&self, id: Uuid) -> Result<TagTypeResponse, AppError> {
        let tag_type = self.require(id).await?;
        let reference_tagtype_ids = self.reference_type_ids(id).await?;
        let tag_count = self.tag_count(id).await?;

        Ok(TagTypeResponse {
            tag_type,
            reference_tagtype_ids,
            tag_count,
        })
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "tag_types", db.operation = "select"))]
    pub async fn get_many(&self, ids: &[Uuid]) -> Result<Vec<TagType>, AppError> {
        let types = sqlx::query_as::<Postgres, TagType>(&format!(
            "SELECT {} FROM tag_types WHERE id = ANY($1) ORDER BY sort_order, name",
            TAG_TYPE_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tag_type_references", db.operation = "select", db.record_id = %id))]
    pub async fn reference_type_ids(&self, id: Uuid) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT reference_tag_type_id FROM tag_type_references WHERE tag_type_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// The tag types whose tags may be referenced by tags of `id`
    #[tracing::instrument(skip(self), fields(db.table = "tag_types", db.operation = "select", db.record_id = %id))]
    pub async fn reference_types(&self, id: Uuid) -> Result<Vec<TagType>, AppError> {
        let types = sqlx::query_as::<Postgres, TagType>(
            r#"
            SELECT t.id, t.name, t.description, t.color, t.sort_order, t.is_active,
                   t.show_in_gallery, t.set_at_upload, t.created_at
            FROM tag_types t
            JOIN tag_type_references r ON r.reference_tag_type_id = t.id
            WHERE r.tag_type_id = $1
            ORDER BY t.sort_order, t.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tags", db.operation = "select", db.record_id = %id))]
    pub async fn tag_count(&self, id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM tags WHERE tag_type_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn replace_references(
        conn: &mut PgConnection,
        id: Uuid,
        reference_ids: &[Uuid],
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM tag_type_references WHERE tag_type_id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if !reference_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO tag_type_references (tag_type_id, reference_tag_type_id)
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

    /// Insert a tag type with its reference types. The input is expected to be checked.
    #[tracing::instrument(skip(self, input), fields(db.table = "tag_types", db.operation = "insert"))]
    pub async fn create(&self, input: &TagTypeInput) -> Result<TagType, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let tag_type = sqlx::query_as::<Postgres, TagType>(&format!(
            r#"
            INSERT INTO tag_types
                (id, name, description, color, sort_order, is_active, show_in_gallery, set_at_upload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            TAG_TYPE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.color)
        .bind(input.sort_order)
        .bind(input.is_active)
        .bind(input.show_in_gallery)
        .bind(input.set_at_upload)
        .fetch_one(&mut **tx)
        .await?;

        Self::replace_references(&mut **tx, tag_type.id, &input.reference_tagtype_ids).await?;
        tx.commit().await?;

        Ok(tag_type)
    }

    #[tracing::instrument(skip(self, input), fields(db.table = "tag_types", db.operation = "update", db.record_id = %id))]
    pub async fn update(&self, id: Uuid, input: &TagTypeInput) -> Result<TagType, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let tag_type = sqlx::query_as::<Postgres, TagType>(&format!(
            r#"
            UPDATE tag_types
            SET name = $2, description = $3, color = $4, sort_order = $5,
                is_active = $6, show_in_gallery = $7, set_at_upload = $8
            WHERE id = $1
            RETURNING {}
            "#,
            TAG_TYPE_COLUMNS
        ))
        .bind(id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(&input.color)
        .bind(input.sort_order)
        .bind(input.is_active)
        .bind(input.show_in_gallery)
        .bind(input.set_at_upload)
        .fetch_optional(&mut **tx)
        .await?;

        let Some(tag_type) = tag_type else {
            tx.rollback().await?;
            return Err(AppError::NotFound(format!("Tag type {} not found", id)));
        };

        Self::replace_references(&mut **tx, id, &input.reference_tagtype_ids).await?;
        tx.commit().await?;

        Ok(tag_type)
    }

    /// Delete a tag type that no tag uses
    #[tracing::instrument(skip(self), fields(db.table = "tag_types", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<TagType, AppError> {
        let tag_type = self.require(id).await?;

        let in_use = self.tag_count(id).await?;
        if in_use > 0 {
            return Err(AppError::BadRequest(format!(
                "Cannot delete tag type \"{}\" because it is being used by {} tag(s).",
                tag_type.name, in_use
            )));
        }

        sqlx::query("DELETE FROM tag_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(tag_type)
    }

    /// Apply a batch of sort orders
    #[tracing::instrument(skip(self, order), fields(db.table = "tag_types", db.operation = "update"))]
    pub async fn update_order(&self, order: &[(Uuid, i32)]) -> Result<u64, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;
        let mut updated = 0;

        for (id, sort_order) in order {
            let result = sqlx::query("UPDATE tag_types SET sort_order = $2 WHERE id = $1")
                .bind(id)
                .bind(sort_order)
                .execute(&mut **tx)
                .await?;
            updated += result.rows_affected();
        }

        tx.commit().await?;
        Ok(updated)
    }

    #[tracing::instrument(skip(self), fields(db.table = "tag_types", db.operation = "update", db.record_id = %id))]
    pub async fn set_show_in_gallery(&self, id: Uuid, value: bool) -> Result<TagType, AppError> {
        self.set_flag(id, "show_in_gallery", value).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "tag_types", db.operation = "update", db.record_id = %id))]
    pub async fn set_set_at_upload(&self, id: Uuid, value: bool) -> Result<TagType, AppError> {
        self.set_flag(id, "set_at_upload", value).await
    }

    // `column` is always one of the literals above
    async fn set_flag(&self, id: Uuid, column: &'static str, value: bool) -> Result<TagType, AppError> {
        let tag_type = sqlx::query_as::<Postgres, TagType>(&format!(
            "UPDATE tag_types SET {} = $2 WHERE id = $1 RETURNING {}",
            column, TAG_TYPE_COLUMNS
        ))
        .bind(id)
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        tag_type.ok_or_else(|| AppError::NotFound(format!("Tag type {} not found", id)))
    }

    /// Look up a tag type by name, creating it with the import defaults when missing
    pub async fn get_or_create_for_import(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<TagType, AppError> {
        let (color, sort_order) = import_tag_type_defaults(name);

        sqlx::query(
            r#"
            INSERT INTO tag_types
                (id, name, description, color, sort_order, is_active, show_in_gallery, set_at_upload)
            VALUES ($1, $2, $3, $4, $5, TRUE, TRUE, TRUE)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(format!("{} tags", name))
        .bind(color)
        .bind(sort_order)
        .execute(&mut *conn)
        .await?;

        let tag_type = sqlx::query_as::<Postgres, TagType>(&format!(
            "SELECT {} FROM tag_types WHERE name = $1",
            TAG_TYPE_COLUMNS
        ))
        .bind(name)
        .fetch_one(conn)
        .await?;

        Ok(tag_type)
    }

    /// Tag names grouped under every tag type name, in display order
    #[tracing::instrument(skip(self), fields(db.table = "tags", db.operation = "select"))]
    pub async fn names_by_type(&self) -> Result<Vec<(String, Vec<String>)>, AppError> {
        let rows = sqlx::query_as::<Postgres, (String, Option<String>)>(
            r#"
            SELECT tt.name, t.name
            FROM tag_types tt
            LEFT JOIN tags t ON t.tag_type_id = tt.id
            ORDER BY tt.sort_order, tt.name, t.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (type_name, tag_name) in rows {
            if grouped.last().map(|(name, _)| name != &type_name).unwrap_or(true) {
                grouped.push((type_name, Vec::new()));
            }
            if let (Some(tag_name), Some((_, tags))) = (tag_name, grouped.last_mut()) {
                tags.push(tag_name);
            }
        }

        Ok(grouped)
    }
}
