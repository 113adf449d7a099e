//! Database access layer for sessionlog-server

pub mod session_logs;
pub mod trackable_objects;

use sessionlog_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open the service database, creating file and schema on first run
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    sessionlog_common::db::init_database(db_path).await
}
