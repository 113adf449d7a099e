//! Aggregate updates
//!
//! Applies one upload's filtered event lines to one aggregate: resolve the
//! aggregate, merge, write back. Each application:
//! - holds the in-process lock for its `(owner, key)`,
//! - runs in a single transaction with a version compare-and-swap,
//! - records a contribution so the same upload is never applied twice.

use serde::Serialize;
use sessionlog_common::format::Metadata;
use sessionlog_common::{AggregateKey, Error, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::session_logs;
use crate::services::{aggregate_resolver, merge};
use crate::utils::{retry_on_lock, KeyedLocks};

/// What happened to an aggregate during one application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAction {
    /// First matching upload; aggregate created
    Created,
    /// Lines appended to an existing aggregate
    Appended,
    /// This upload was merged earlier; nothing written
    AlreadyApplied,
}

/// Result of applying one upload to one aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateUpdate {
    pub key: AggregateKey,
    pub aggregate_id: Uuid,
    pub action: UpdateAction,
    pub lines_added: usize,
}

/// Lock key: aggregates are unique per owner
type OwnerKey = (String, AggregateKey);

/// Applies filtered event lines to aggregates
#[derive(Clone)]
pub struct AggregateUpdater {
    db: SqlitePool,
    locks: Arc<KeyedLocks<OwnerKey>>,
    max_attempts: u32,
    max_lock_wait_ms: u64,
}

impl AggregateUpdater {
    pub fn new(db: SqlitePool, max_attempts: u32, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            locks: Arc::new(KeyedLocks::new()),
            max_attempts: max_attempts.max(1),
            max_lock_wait_ms,
        }
    }

    /// Merge `lines` from upload `source_id` into the aggregate for `key`
    ///
    /// `upload_metadata` is only used if the aggregate has to be created.
    pub async fn apply<S: AsRef<str> + Sync>(
        &self,
        owner: &str,
        key: &AggregateKey,
        source_id: Uuid,
        upload_metadata: &Metadata,
        lines: &[S],
    ) -> Result<AggregateUpdate> {
        let _guard = self.locks.lock(&(owner.to_string(), key.clone())).await;

        for attempt in 1..=self.max_attempts {
            let outcome = retry_on_lock("aggregate update", self.max_lock_wait_ms, || {
                self.try_apply(owner, key, source_id, upload_metadata, lines)
            })
            .await?;

            match outcome {
                Some(update) => {
                    info!(
                        owner,
                        session_id = %source_id,
                        aggregate_id = %update.aggregate_id,
                        aggregate_kind = %key.kind,
                        aggregate_value = %key.value,
                        action = ?update.action,
                        lines = update.lines_added,
                        "Aggregate updated"
                    );
                    return Ok(update);
                }
                None => {
                    warn!(
                        owner,
                        aggregate_kind = %key.kind,
                        aggregate_value = %key.value,
                        attempt,
                        "Aggregate changed concurrently, retrying"
                    );
                }
            }
        }

        Err(Error::Conflict(format!(
            "Aggregate {} for owner '{}' kept changing after {} attempts",
            key, owner, self.max_attempts
        )))
    }

    /// One transactional attempt; `None` means another writer won the race
    async fn try_apply<S: AsRef<str>>(
        &self,
        owner: &str,
        key: &AggregateKey,
        source_id: Uuid,
        upload_metadata: &Metadata,
        lines: &[S],
    ) -> Result<Option<AggregateUpdate>> {
        let mut tx = self.db.begin().await?;

        let existing = aggregate_resolver::find_aggregate(&mut tx, owner, key).await?;

        let (aggregate_id, action) = match existing {
            Some(aggregate) => {
                if session_logs::contribution_exists(&mut tx, aggregate.id, source_id).await? {
                    debug!(
                        aggregate_id = %aggregate.id,
                        session_id = %source_id,
                        "Upload already merged into aggregate"
                    );
                    tx.rollback().await?;
                    return Ok(Some(AggregateUpdate {
                        key: key.clone(),
                        aggregate_id: aggregate.id,
                        action: UpdateAction::AlreadyApplied,
                        lines_added: 0,
                    }));
                }

                let content = merge::append_events(&aggregate.content, lines)?;
                let updated = session_logs::update_aggregate_content(
                    &mut tx,
                    aggregate.id,
                    aggregate.version,
                    &content,
                )
                .await?;
                if !updated {
                    return Ok(None);
                }
                (aggregate.id, UpdateAction::Appended)
            }
            None => {
                let content = merge::create_aggregate_content(upload_metadata, key.kind, lines)?;
                match session_logs::insert_aggregate(&mut tx, owner, key, &content).await {
                    Ok(aggregate) => (aggregate.id, UpdateAction::Created),
                    Err(e) if e.is_unique_violation() => return Ok(None),
                    Err(e) => return Err(e),
                }
            }
        };

        session_logs::record_contribution(&mut tx, aggregate_id, source_id, lines.len()).await?;
        tx.commit().await?;

        Ok(Some(AggregateUpdate {
            key: key.clone(),
            aggregate_id,
            action,
            lines_added: lines.len(),
        }))
    }
}
