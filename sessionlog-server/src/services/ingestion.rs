//! Session log ingestion
//!
//! **Flow:**
//! 1. Validate the marker and metadata block (nothing persisted on failure)
//! 2. Persist the raw upload verbatim
//! 3. Parse event lines; unparseable lines are skipped and logged
//! 4. Scene aggregate: every parseable event line, if `SceneName` is set
//! 5. Dimension aggregates: one per distinct key, with only matching lines
//!
//! Aggregate updates are independent. A failure part way leaves the raw log
//! and the updates made so far; [`IngestionService::reaggregate`] repairs the
//! rest without double-applying anything.

use serde::Serialize;
use sessionlog_common::db::SessionLog;
use sessionlog_common::dimension::classify;
use sessionlog_common::format::{self, Metadata};
use sessionlog_common::{AggregateKey, DimensionKey, Error, Result};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::session_logs;
use crate::services::aggregate_updater::{AggregateUpdate, AggregateUpdater};
use crate::utils::retry_on_lock;

/// Result of ingesting (or reaggregating) one upload
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// The persisted raw upload
    pub session: SessionLog,
    /// Non-blank event lines in the upload
    pub events_total: usize,
    /// Event lines skipped because they were not JSON objects
    pub events_skipped: usize,
    /// One entry per aggregate touched
    pub aggregates: Vec<AggregateUpdate>,
}

/// An event line that parsed, with its dimension keys
struct ClassifiedLine<'a> {
    line: &'a str,
    keys: BTreeSet<DimensionKey>,
}

/// Event lines of one upload after parsing
struct ParsedEvents<'a> {
    lines: Vec<ClassifiedLine<'a>>,
    total: usize,
    skipped: usize,
}

impl<'a> ParsedEvents<'a> {
    fn parse(session_id: Uuid, event_lines: &[&'a str]) -> Self {
        let mut lines = Vec::with_capacity(event_lines.len());
        let mut skipped = 0;

        for (index, &line) in event_lines.iter().enumerate() {
            match format::parse_event(line) {
                Ok(record) => lines.push(ClassifiedLine {
                    line,
                    keys: classify(&record),
                }),
                Err(e) => {
                    skipped += 1;
                    warn!(
                        session_id = %session_id,
                        event_index = index,
                        error = %e,
                        "Skipping unparseable event line"
                    );
                }
            }
        }

        Self {
            lines,
            total: event_lines.len(),
            skipped,
        }
    }

    /// Every parseable line, classified or not
    fn all_lines(&self) -> Vec<&'a str> {
        self.lines.iter().map(|c| c.line).collect()
    }

    /// Distinct keys across the batch, in first-seen order
    fn distinct_keys(&self) -> Vec<&DimensionKey> {
        let mut seen = BTreeSet::new();
        self.lines
            .iter()
            .flat_map(|c| c.keys.iter())
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// Lines classified under `key`, in upload order
    fn lines_for(&self, key: &DimensionKey) -> Vec<&'a str> {
        self.lines
            .iter()
            .filter(|c| c.keys.contains(key))
            .map(|c| c.line)
            .collect()
    }
}

/// Ingestion orchestrator
#[derive(Clone)]
pub struct IngestionService {
    db: SqlitePool,
    updater: AggregateUpdater,
    max_lock_wait_ms: u64,
}

impl IngestionService {
    pub fn new(db: SqlitePool, max_attempts: u32, max_lock_wait_ms: u64) -> Self {
        Self {
            updater: AggregateUpdater::new(db.clone(), max_attempts, max_lock_wait_ms),
            db,
            max_lock_wait_ms,
        }
    }

    /// Ingest one raw upload for `owner`
    pub async fn ingest(&self, owner: &str, raw_content: &str) -> Result<IngestOutcome> {
        validate_owner(owner)?;

        if !format::has_marker(raw_content) {
            return Err(Error::Format(format!(
                "upload must start with {}",
                format::SESSION_MARKER
            )));
        }

        let split = format::split(raw_content);
        let metadata = format::parse_metadata(&split.metadata_lines)?;

        let session = retry_on_lock("insert session log", self.max_lock_wait_ms, || {
            session_logs::insert_session_log(&self.db, owner, raw_content)
        })
        .await?;

        info!(
            owner,
            session_id = %session.id,
            session_name = metadata.session_name(),
            scene = ?metadata.scene_name(),
            events = split.event_lines.len(),
            "Session log stored"
        );

        self.aggregate(owner, session, &metadata, &split.event_lines).await
    }

    /// Re-run aggregation for a stored raw upload
    ///
    /// Aggregates the upload already reached are reported as already
    /// applied; missing ones are created or appended.
    pub async fn reaggregate(&self, owner: &str, session_id: Uuid) -> Result<IngestOutcome> {
        validate_owner(owner)?;

        let session = session_logs::get_session_log(&self.db, session_id)
            .await?
            .filter(|log| log.owner == owner)
            .ok_or_else(|| Error::NotFound(format!("Session log {}", session_id)))?;

        if session.is_aggregate() {
            return Err(Error::InvalidInput(format!(
                "Session log {} is an aggregate; only raw uploads can be reaggregated",
                session_id
            )));
        }

        let content = session.content.clone();
        let split = format::split(&content);
        let metadata = format::parse_metadata(&split.metadata_lines)?;

        info!(owner, session_id = %session_id, "Reaggregating session log");
        self.aggregate(owner, session, &metadata, &split.event_lines).await
    }

    async fn aggregate(
        &self,
        owner: &str,
        session: SessionLog,
        metadata: &Metadata,
        event_lines: &[&str],
    ) -> Result<IngestOutcome> {
        let events = ParsedEvents::parse(session.id, event_lines);
        let mut aggregates = Vec::new();

        if let Some(scene_name) = metadata.scene_name() {
            let update = self
                .updater
                .apply(
                    owner,
                    &AggregateKey::scene(scene_name),
                    session.id,
                    metadata,
                    &events.all_lines(),
                )
                .await?;
            aggregates.push(update);
        } else {
            debug!(session_id = %session.id, "No SceneName, skipping scene aggregate");
        }

        for key in events.distinct_keys() {
            let lines = events.lines_for(key);
            let update = self
                .updater
                .apply(owner, &key.aggregate_key(), session.id, metadata, &lines)
                .await?;
            aggregates.push(update);
        }

        info!(
            owner,
            session_id = %session.id,
            events = events.total,
            skipped = events.skipped,
            aggregates = aggregates.len(),
            "Ingestion complete"
        );

        Ok(IngestOutcome {
            session,
            events_total: events.total,
            events_skipped: events.skipped,
            aggregates,
        })
    }
}

fn validate_owner(owner: &str) -> Result<()> {
    if owner.trim().is_empty() {
        return Err(Error::InvalidInput("owner must not be empty".to_string()));
    }
    Ok(())
}
