//! Aggregate lookup
//!
//! Finds the single aggregate log for `(owner, kind, value)` through the
//! typed key columns. Raw uploads are never candidates, even if their
//! `SessionName` happens to equal a discriminator token.

use sessionlog_common::db::SessionLog;
use sessionlog_common::{AggregateKey, Error, Result};
use sqlx::SqliteConnection;

use crate::db::session_logs;

/// Locate the aggregate for `key`, if one exists
///
/// More than one match is an invariant violation and is reported as
/// [`Error::AggregateAmbiguity`] instead of picking one.
pub async fn find_aggregate(
    conn: &mut SqliteConnection,
    owner: &str,
    key: &AggregateKey,
) -> Result<Option<SessionLog>> {
    let mut matches = session_logs::find_aggregates(conn, owner, key).await?;

    match matches.len() {
        0 => Ok(None),
        1 => Ok(matches.pop()),
        count => {
            tracing::error!(
                owner,
                aggregate_kind = %key.kind,
                aggregate_value = %key.value,
                count,
                "Multiple aggregates share one key, refusing to update"
            );
            Err(Error::AggregateAmbiguity {
                owner: owner.to_string(),
                kind: key.kind.to_string(),
                value: key.value.clone(),
                count,
            })
        }
    }
}
