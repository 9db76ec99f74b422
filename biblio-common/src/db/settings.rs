//! Settings database operations
//!
//! Get/set accessors for the key-value `settings` table.

use crate::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Read and parse a setting; `None` when the key is absent or NULL
pub async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((Some(value),)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting '{}' failed: {}", key, e)))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

/// Insert or replace a setting
pub async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init::create_settings_table(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let pool = setup_test_db().await;
        set_setting(&pool, "merge_batch_size", 12usize).await.unwrap();
        let value: Option<usize> = get_setting(&pool, "merge_batch_size").await.unwrap();
        assert_eq!(value, Some(12));

        set_setting(&pool, "merge_batch_size", 3usize).await.unwrap();
        let value: Option<usize> = get_setting(&pool, "merge_batch_size").await.unwrap();
        assert_eq!(value, Some(3));
    }

    #[tokio::test]
    async fn test_missing_setting_is_none() {
        let pool = setup_test_db().await;
        let value: Option<usize> = get_setting(&pool, "nope").await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_unparseable_setting_is_config_error() {
        let pool = setup_test_db().await;
        set_setting(&pool, "merge_worker_count", "many").await.unwrap();
        let result: Result<Option<usize>> = get_setting(&pool, "merge_worker_count").await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
