//! sessionlog-server library
//!
//! HTTP front end for session log ingestion: uploads are stored verbatim
//! and folded into per-owner scene and dimension aggregates.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sessionlog_common::config::TomlConfig;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;
pub mod utils;

use services::IngestionService;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Ingestion orchestrator; owns the per-aggregate locks
    pub ingestion: IngestionService,
    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: &TomlConfig) -> Self {
        let ingestion = IngestionService::new(
            db.clone(),
            config.aggregate.max_attempts,
            config.aggregate.database_max_lock_wait_ms,
        );
        Self {
            db,
            ingestion,
            max_upload_bytes: config.max_upload_bytes,
        }
    }
}

/// Build application router
///
/// Everything under `/api` needs the owner header; `/health` does not.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let api = Router::new()
        .route("/api/sessions/upload", post(api::upload_session))
        .route("/api/sessions", get(api::list_sessions))
        .route("/api/sessions/all", get(api::list_all_sessions))
        .route("/api/sessions/:id", get(api::get_session))
        .route("/api/sessions/:id/reaggregate", post(api::reaggregate_session))
        .route("/api/aggregates", get(api::list_aggregates))
        .route("/api/trackable-objects/upload", post(api::upload_trackable_object))
        .route("/api/trackable-objects", get(api::list_trackable_objects));

    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(api)
        .merge(api::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
