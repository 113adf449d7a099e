//! Trackable object storage
//!
//! Trackable object uploads are kept verbatim; no aggregation applies.

use sessionlog_common::db::TrackableObject;
use sessionlog_common::time::{now, to_db_timestamp};
use sessionlog_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

pub async fn insert_trackable_object(
    pool: &SqlitePool,
    owner: &str,
    content: &str,
) -> Result<TrackableObject> {
    let id = Uuid::new_v4();
    let created_at = now();
    let timestamp = to_db_timestamp(&created_at);

    sqlx::query(
        r#"
        INSERT INTO trackable_objects (guid, owner, content, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(owner)
    .bind(content)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(pool)
    .await?;

    Ok(TrackableObject {
        id,
        owner: owner.to_string(),
        content: content.to_string(),
        created_at,
        updated_at: created_at,
    })
}

pub async fn list_by_owner(pool: &SqlitePool, owner: &str) -> Result<Vec<TrackableObject>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, owner, content, created_at, updated_at
        FROM trackable_objects
        WHERE owner = ?
        ORDER BY created_at ASC, guid ASC
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    rows.iter().map(TrackableObject::from_row).collect()
}
