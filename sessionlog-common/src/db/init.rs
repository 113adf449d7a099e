//! Database initialization
//!
//! Creates the database on first run and applies the schema. Every
//! statement is idempotent so startup can run it against an existing file.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Per-connection wait for a SQLite write lock before `database is locked`
const BUSY_TIMEOUT_MS: u64 = 250;

/// Open (creating if needed) the database and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // WAL lets readers proceed while an aggregate write holds the lock
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Apply the full schema to an open pool
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_session_logs_table(pool).await?;
    create_aggregate_contributions_table(pool).await?;
    create_trackable_objects_table(pool).await?;
    Ok(())
}

/// Raw uploads and aggregate logs
///
/// `aggregate_kind`/`aggregate_value` are NULL for raw uploads. For
/// aggregates they form the lookup key, unique per owner.
pub async fn create_session_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_logs (
            guid TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            content TEXT NOT NULL,
            aggregate_kind TEXT,
            aggregate_value TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((aggregate_kind IS NULL) = (aggregate_value IS NULL)),
            CHECK (aggregate_kind IS NULL OR aggregate_kind IN
                ('scene', 'stimulus_type', 'emotion_label', 'feature_name'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_session_logs_owner ON session_logs(owner, created_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_session_logs_aggregate_key
        ON session_logs(owner, aggregate_kind, aggregate_value)
        WHERE aggregate_kind IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ledger of which raw upload has been merged into which aggregate
pub async fn create_aggregate_contributions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS aggregate_contributions (
            aggregate_guid TEXT NOT NULL REFERENCES session_logs(guid),
            source_guid TEXT NOT NULL REFERENCES session_logs(guid),
            line_count INTEGER NOT NULL,
            applied_at TEXT NOT NULL,
            PRIMARY KEY (aggregate_guid, source_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Trackable object uploads, stored verbatim per owner
pub async fn create_trackable_objects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trackable_objects (
            guid TEXT PRIMARY KEY,
            owner TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_trackable_objects_owner ON trackable_objects(owner, created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
