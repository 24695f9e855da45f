use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;

use crate::{
    error::{AppError, AppResult},
    models::{NewUser, User},
};

/// Local persistent store holding users, their preferences and the movie catalog
///
/// Every write is a single statement committed on its own; the ingestion task
/// and request handlers share the pool without additional locking.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: String,
    name: Option<String>,
    handle: Option<String>,
    created_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            user_id: row.user_id,
            name: row.name,
            handle: row.handle,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the user if absent; profile fields sent later fill in blanks
    /// but never erase what is already stored
    pub async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, handle, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                name = COALESCE(excluded.name, users.name),
                handle = COALESCE(excluded.handle, users.handle)
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.name)
        .bind(&user.handle)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user.user_id, "User ensured");

        self.get_user(&user.user_id).await?.ok_or_else(|| {
            AppError::Internal(format!("User {} missing after insert", user.user_id))
        })
    }

    pub async fn get_user(&self, user_id: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, name, handle, created_at FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Inserts a bare user row when none exists yet
    pub(crate) async fn ensure_user(&self, user_id: &str) -> AppResult<()> {
        sqlx::query("INSERT OR IGNORE INTO users (user_id, created_at) VALUES (?, ?)")
            .bind(user_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("Column serialization error: {}", e)))
}

pub(crate) fn from_json<T: DeserializeOwned>(raw: &str) -> AppResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Internal(format!("Column deserialization error: {}", e)))
}

pub(crate) fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Internal(format!("Invalid stored timestamp {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;

    async fn store() -> Store {
        Store::new(create_memory_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_create_user_is_idempotent() {
        let store = store().await;

        let first = store.create_user(&NewUser::new("42")).await.unwrap();
        let second = store.create_user(&NewUser::new("42")).await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_create_user_keeps_existing_profile_fields() {
        let store = store().await;

        let user = NewUser {
            user_id: "7".to_string(),
            name: Some("Ada".to_string()),
            handle: Some("ada".to_string()),
        };
        store.create_user(&user).await.unwrap();

        let updated = store.create_user(&NewUser::new("7")).await.unwrap();
        assert_eq!(updated.name.as_deref(), Some("Ada"));
        assert_eq!(updated.handle.as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let store = store().await;
        assert_eq!(store.get_user("nobody").await.unwrap(), None);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("2025-01-01T00:00:00+00:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }
}
