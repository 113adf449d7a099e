//! Session log database operations
//!
//! Raw uploads are written straight to the pool. Aggregate reads and writes
//! take a connection so they can run inside the caller's transaction.

use sessionlog_common::db::{SessionLog, SESSION_LOG_COLUMNS};
use sessionlog_common::time::{now, to_db_timestamp};
use sessionlog_common::{AggregateKey, AggregateKind, Result};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Persist a raw upload verbatim
pub async fn insert_session_log(pool: &SqlitePool, owner: &str, content: &str) -> Result<SessionLog> {
    let id = Uuid::new_v4();
    let created_at = now();
    let timestamp = to_db_timestamp(&created_at);

    sqlx::query(
        r#"
        INSERT INTO session_logs (guid, owner, content, version, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(owner)
    .bind(content)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(pool)
    .await?;

    Ok(SessionLog {
        id,
        owner: owner.to_string(),
        content: content.to_string(),
        aggregate: None,
        version: 0,
        created_at,
        updated_at: created_at,
    })
}

/// Load one session log by id
pub async fn get_session_log(pool: &SqlitePool, id: Uuid) -> Result<Option<SessionLog>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM session_logs WHERE guid = ?",
        SESSION_LOG_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(SessionLog::from_row).transpose()
}

/// Count an owner's session logs, raw and aggregate
pub async fn count_by_owner(pool: &SqlitePool, owner: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_logs WHERE owner = ?")
        .bind(owner)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// One page of an owner's session logs, oldest first
pub async fn list_by_owner(
    pool: &SqlitePool,
    owner: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<SessionLog>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM session_logs WHERE owner = ? ORDER BY created_at ASC, guid ASC LIMIT ? OFFSET ?",
        SESSION_LOG_COLUMNS
    ))
    .bind(owner)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(SessionLog::from_row).collect()
}

/// Count every session log
pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_logs")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// One page of every session log, oldest first
pub async fn list_all(pool: &SqlitePool, limit: i64, offset: i64) -> Result<Vec<SessionLog>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM session_logs ORDER BY created_at ASC, guid ASC LIMIT ? OFFSET ?",
        SESSION_LOG_COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    rows.iter().map(SessionLog::from_row).collect()
}

/// An owner's aggregates, optionally narrowed by kind and value
pub async fn list_aggregates(
    pool: &SqlitePool,
    owner: &str,
    kind: Option<AggregateKind>,
    value: Option<&str>,
) -> Result<Vec<SessionLog>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM session_logs
        WHERE owner = ?
          AND aggregate_kind IS NOT NULL
          AND (? IS NULL OR aggregate_kind = ?)
          AND (? IS NULL OR aggregate_value = ?)
        ORDER BY aggregate_kind ASC, aggregate_value ASC
        "#,
        SESSION_LOG_COLUMNS
    ))
    .bind(owner)
    .bind(kind.map(AggregateKind::as_str))
    .bind(kind.map(AggregateKind::as_str))
    .bind(value)
    .bind(value)
    .fetch_all(pool)
    .await?;

    rows.iter().map(SessionLog::from_row).collect()
}

/// Every aggregate stored under `(owner, key)`
///
/// The unique index keeps this at zero or one row.
pub async fn find_aggregates(
    conn: &mut SqliteConnection,
    owner: &str,
    key: &AggregateKey,
) -> Result<Vec<SessionLog>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM session_logs WHERE owner = ? AND aggregate_kind = ? AND aggregate_value = ?",
        SESSION_LOG_COLUMNS
    ))
    .bind(owner)
    .bind(key.kind.as_str())
    .bind(&key.value)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(SessionLog::from_row).collect()
}

/// Insert a new aggregate
///
/// Fails with a UNIQUE violation if another writer created the same key first.
pub async fn insert_aggregate(
    conn: &mut SqliteConnection,
    owner: &str,
    key: &AggregateKey,
    content: &str,
) -> Result<SessionLog> {
    let id = Uuid::new_v4();
    let created_at = now();
    let timestamp = to_db_timestamp(&created_at);

    sqlx::query(
        r#"
        INSERT INTO session_logs (
            guid, owner, content, aggregate_kind, aggregate_value,
            version, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(owner)
    .bind(content)
    .bind(key.kind.as_str())
    .bind(&key.value)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(&mut *conn)
    .await?;

    Ok(SessionLog {
        id,
        owner: owner.to_string(),
        content: content.to_string(),
        aggregate: Some(key.clone()),
        version: 0,
        created_at,
        updated_at: created_at,
    })
}

/// Replace an aggregate's content if its version is still `expected_version`
///
/// Returns false when another writer got there first.
pub async fn update_aggregate_content(
    conn: &mut SqliteConnection,
    id: Uuid,
    expected_version: i64,
    content: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE session_logs
        SET content = ?, version = version + 1, updated_at = ?
        WHERE guid = ? AND version = ? AND aggregate_kind IS NOT NULL
        "#,
    )
    .bind(content)
    .bind(to_db_timestamp(&now()))
    .bind(id.to_string())
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Whether `source_id` has already been merged into `aggregate_id`
pub async fn contribution_exists(
    conn: &mut SqliteConnection,
    aggregate_id: Uuid,
    source_id: Uuid,
) -> Result<bool> {
    let exists: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM aggregate_contributions WHERE aggregate_guid = ? AND source_guid = ?",
    )
    .bind(aggregate_id.to_string())
    .bind(source_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(exists.is_some())
}

/// Record that `source_id` contributed `line_count` lines to `aggregate_id`
pub async fn record_contribution(
    conn: &mut SqliteConnection,
    aggregate_id: Uuid,
    source_id: Uuid,
    line_count: usize,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO aggregate_contributions (aggregate_guid, source_guid, line_count, applied_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(aggregate_id.to_string())
    .bind(source_id.to_string())
    .bind(line_count as i64)
    .bind(to_db_timestamp(&now()))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Raw uploads that contributed to an aggregate, in application order
pub async fn list_contributions(pool: &SqlitePool, aggregate_id: Uuid) -> Result<Vec<(Uuid, i64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT source_guid, line_count FROM aggregate_contributions
        WHERE aggregate_guid = ?
        ORDER BY applied_at ASC, rowid ASC
        "#,
    )
    .bind(aggregate_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(guid, lines)| Ok((sessionlog_common::db::parse_guid(&guid)?, lines)))
        .collect()
}
