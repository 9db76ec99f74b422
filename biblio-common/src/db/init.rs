//! Database initialization
//!
//! Opens (or creates) the embedded SQLite Record Store and ensures the schema
//! and default settings exist. The store is used with a single writer per
//! process; readers may come from a separate pool.

use crate::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Busy timeout applied to every connection
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Default values seeded into the settings table
pub const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("merge_batch_size", "64"),
    ("merge_max_in_flight", "32"),
    ("merge_worker_count", "16"),
    ("merge_page_size", "256"),
];

fn connect_options(db_path: &Path, create: bool) -> SqliteConnectOptions {
    // WAL lets the readers keep going while the single writer commits
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .foreign_keys(true)
}

/// Initialize database connection and create tables if needed
///
/// Returns a read-mostly pool with `max_connections` connections.
pub async fn init_database(db_path: &Path, max_connections: u32) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(connect_options(db_path, true))
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_converted_table(&pool).await?;
    create_cluster_table(&pool).await?;
    create_finalized_table(&pool).await?;
    create_merge_failures_table(&pool).await?;
    create_settings_table(&pool).await?;

    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Open the pool used by the sole writer
///
/// Exactly one connection: every write in the process goes through it.
pub async fn open_writer_pool(db_path: &Path) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect_with(connect_options(db_path, false))
        .await?;

    debug!("Writer connection opened: {}", db_path.display());

    Ok(pool)
}

/// Converted records, one JSON document per row (written upstream)
pub async fn create_converted_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS converted (
            id INTEGER PRIMARY KEY,
            source_id TEXT NOT NULL,
            data TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Cluster assignments, one row per (cluster, record) pair
pub async fn create_cluster_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cluster (
            cluster_id INTEGER NOT NULL,
            converted_id INTEGER NOT NULL,
            FOREIGN KEY (converted_id) REFERENCES converted(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cluster_cluster_id ON cluster (cluster_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cluster_converted_id ON cluster (converted_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Finalized union records with their audit trails
pub async fn create_finalized_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS finalized (
            id INTEGER PRIMARY KEY,
            cluster_id INTEGER NOT NULL,
            data TEXT NOT NULL,
            audit_events TEXT NOT NULL,
            run_id TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_finalized_cluster_id ON finalized (cluster_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Per-cluster merge/audit failures, kept apart from audit trails
pub async fn create_merge_failures_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS merge_failures (
            id INTEGER PRIMARY KEY,
            run_id TEXT NOT NULL,
            cluster_id INTEGER NOT NULL,
            stage TEXT NOT NULL,
            actor TEXT,
            message TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ensure every default setting exists and is non-NULL
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    for (key, value) in DEFAULT_SETTINGS {
        ensure_setting(pool, key, value).await?;
    }
    Ok(())
}

async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    // INSERT OR IGNORE tolerates two processes initializing the same file
    let inserted = sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
        .bind(key)
        .bind(default_value)
        .execute(pool)
        .await?
        .rows_affected();

    if inserted > 0 {
        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let reset = sqlx::query("UPDATE settings SET value = ? WHERE key = ? AND value IS NULL")
        .bind(default_value)
        .bind(key)
        .execute(pool)
        .await?
        .rows_affected();

    if reset > 0 {
        info!("Reset NULL setting '{}' to default value: {}", key, default_value);
    }

    Ok(())
}
