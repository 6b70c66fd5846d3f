use catalog_core::{models::User, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, password_hash, is_staff, is_active, created_at";

/// Repository for API accounts
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Create the account or replace its password and flags
    #[tracing::instrument(skip(self, password_hash), fields(db.table = "users", db.operation = "upsert"))]
    pub async fn upsert(
        &self,
        username: &str,
        password_hash: &str,
        is_staff: bool,
    ) -> Result<User, AppError> {
        let user = sqlx::query_as::<Postgres, User>(&format!(
            r#"
            INSERT INTO users (id, username, password_hash, is_staff, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (username) DO UPDATE
            SET password_hash = EXCLUDED.password_hash,
                is_staff = EXCLUDED.is_staff,
                is_active = TRUE
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .bind(is_staff)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }
}
