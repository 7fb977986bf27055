use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::model::{User, UserInput};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn create(&self, input: &UserInput) -> Result<User, StoreError> {
        let now = Utc::now();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, status, phone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.email.trim())
        .bind(input.status)
        .bind(&input.phone)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        debug!(id = user.id, "user created");
        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    /// `None` when no row has this id. `created_at` is left untouched.
    pub async fn update(&self, id: i64, input: &UserInput) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = ?, email = ?, status = ?, phone = ?, updated_at = ?
            WHERE id = ?
            RETURNING *
            "#,
        )
        .bind(input.name.trim())
        .bind(input.email.trim())
        .bind(input.status)
        .bind(&input.phone)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Returns the row as it was before deletion.
    pub async fn delete(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("DELETE FROM users WHERE id = ? RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn server_version(&self) -> Result<String, StoreError> {
        let (version,): (String,) = sqlx::query_as("SELECT sqlite_version()")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> UserStore {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let store = UserStore::new(pool);
    store.migrate().await.unwrap();
    store
}
