//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::dimension::{AggregateKey, AggregateKind};
use crate::{Error, Result};

/// Column list matching [`SessionLog::from_row`]
pub const SESSION_LOG_COLUMNS: &str =
    "guid, owner, content, aggregate_kind, aggregate_value, version, created_at, updated_at";

/// One persisted session log: a raw upload or an aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionLog {
    pub id: Uuid,
    pub owner: String,
    pub content: String,
    /// Set for aggregate logs only
    pub aggregate: Option<AggregateKey>,
    /// Bumped on every content update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionLog {
    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }

    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("guid")?;
        let kind: Option<String> = row.try_get("aggregate_kind")?;
        let value: Option<String> = row.try_get("aggregate_value")?;

        let aggregate = match (kind, value) {
            (Some(kind), Some(value)) => Some(AggregateKey::new(kind.parse::<AggregateKind>()?, value)),
            (None, None) => None,
            _ => {
                return Err(Error::Internal(format!(
                    "Session log {} has a partial aggregate key",
                    id
                )))
            }
        };

        Ok(Self {
            id: parse_guid(&id)?,
            owner: row.try_get("owner")?,
            content: row.try_get("content")?,
            aggregate,
            version: row.try_get("version")?,
            created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
        })
    }
}

/// One trackable object upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackableObject {
    pub id: Uuid,
    pub owner: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackableObject {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: parse_guid(&row.try_get::<String, _>("guid")?)?,
            owner: row.try_get("owner")?,
            content: row.try_get("content")?,
            created_at: parse_timestamp(&row.try_get::<String, _>("created_at")?)?,
            updated_at: parse_timestamp(&row.try_get::<String, _>("updated_at")?)?,
        })
    }
}

pub fn parse_guid(guid: &str) -> Result<Uuid> {
    Uuid::parse_str(guid).map_err(|e| Error::Internal(format!("Invalid GUID '{}': {}", guid, e)))
}

pub fn parse_timestamp(timestamp: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", timestamp, e)))
}
