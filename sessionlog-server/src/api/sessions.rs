//! Session log API
//!
//! Uploads go through [`IngestionService`](crate::services::IngestionService);
//! reads are paginated with [`calculate_pagination`].

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sessionlog_common::db::SessionLog;
use sessionlog_common::AggregateKind;
use uuid::Uuid;

use crate::api::Owner;
use crate::db::session_logs;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, Pagination};
use crate::services::IngestOutcome;
use crate::AppState;

/// Query parameters for paginated listings
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Page number (1-indexed)
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

/// One page of session logs
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub sessions: Vec<SessionLog>,
}

/// Aggregate filter
#[derive(Debug, Deserialize)]
pub struct AggregateQuery {
    /// `scene`, `stimulus_type`, `emotion_label`, `feature_name`, or a
    /// discriminator token such as `#SCENENAMESESSION`
    pub kind: Option<String>,
    pub value: Option<String>,
}

/// POST /api/sessions/upload
///
/// Body is the raw session log text.
pub async fn upload_session(
    State(state): State<AppState>,
    owner: Owner,
    body: String,
) -> ApiResult<(StatusCode, Json<IngestOutcome>)> {
    let outcome = state.ingestion.ingest(owner.as_str(), &body).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/sessions
///
/// The caller's logs, raw uploads and aggregates alike.
pub async fn list_sessions(
    State(state): State<AppState>,
    owner: Owner,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<SessionListResponse>> {
    let total = session_logs::count_by_owner(&state.db, owner.as_str()).await?;
    let pagination = calculate_pagination(total, query.page);
    let sessions = session_logs::list_by_owner(
        &state.db,
        owner.as_str(),
        pagination.limit(),
        pagination.offset,
    )
    .await?;

    Ok(Json(SessionListResponse {
        pagination,
        sessions,
    }))
}

/// GET /api/sessions/all
pub async fn list_all_sessions(
    State(state): State<AppState>,
    _owner: Owner,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<SessionListResponse>> {
    let total = session_logs::count_all(&state.db).await?;
    let pagination = calculate_pagination(total, query.page);
    let sessions =
        session_logs::list_all(&state.db, pagination.limit(), pagination.offset).await?;

    Ok(Json(SessionListResponse {
        pagination,
        sessions,
    }))
}

/// GET /api/sessions/:id
///
/// Logs owned by someone else are reported as not found.
pub async fn get_session(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionLog>> {
    session_logs::get_session_log(&state.db, id)
        .await?
        .filter(|log| log.owner == owner.as_str())
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Session log {}", id)))
}

/// POST /api/sessions/:id/reaggregate
pub async fn reaggregate_session(
    State(state): State<AppState>,
    owner: Owner,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<IngestOutcome>> {
    let outcome = state.ingestion.reaggregate(owner.as_str(), id).await?;
    Ok(Json(outcome))
}

/// GET /api/aggregates?kind=&value=
pub async fn list_aggregates(
    State(state): State<AppState>,
    owner: Owner,
    Query(query): Query<AggregateQuery>,
) -> ApiResult<Json<Vec<SessionLog>>> {
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<AggregateKind>)
        .transpose()?;

    let aggregates =
        session_logs::list_aggregates(&state.db, owner.as_str(), kind, query.value.as_deref())
            .await?;
    Ok(Json(aggregates))
}
