//! Integration tests for sessionlog-server API endpoints
//!
//! Tests cover:
//! - Health endpoint (no owner header required)
//! - Session upload, listing, lookup, reaggregation
//! - Aggregate listing and filters
//! - Trackable objects
//! - Owner header enforcement, owner isolation, body size limit

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use sessionlog_common::config::TomlConfig;
use sessionlog_common::db::init_schema;
use sessionlog_common::format::METADATA_LINE_COUNT;
use sessionlog_server::{build_router, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot` method

const OWNER: &str = "user-1";

/// Test helper: in-memory database with schema
async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Should open in-memory database");
    init_schema(&pool).await.expect("Should create schema");
    pool
}

/// Test helper: router with default config
fn setup_app(db: SqlitePool) -> axum::Router {
    build_router(AppState::new(db, &TomlConfig::default()))
}

/// Test helper: request carrying the owner header
fn owner_request(method: &str, uri: &str, owner: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Owner-Id", owner)
        .body(body.into())
        .unwrap()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn upload_body(scene: &str, events: &[&str]) -> String {
    let mut lines = vec![format!(
        "#SESSION {{\"SessionName\": \"S1\", \"SceneName\": \"{}\"}}",
        scene
    )];
    lines.resize(METADATA_LINE_COUNT, String::new());
    lines.extend(events.iter().map(|e| e.to_string()));
    lines.join("\n")
}

async fn upload(app: &axum::Router, owner: &str, body: String) -> Value {
    let response = app
        .clone()
        .oneshot(owner_request("POST", "/api/sessions/upload", owner, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    extract_json(response.into_body()).await
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_owner_required() {
    let app = setup_app(setup_test_db().await);

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "sessionlog-server");
    assert!(body["version"].is_string());
    assert!(body["git_hash"].is_string());
}

// =============================================================================
// Session Upload
// =============================================================================

#[tokio::test]
async fn test_upload_returns_outcome() {
    let app = setup_app(setup_test_db().await);

    let body = upload(
        &app,
        OWNER,
        upload_body("Forest", &[r#"{"StimulusType":1}"#, r#"{"FeatureName":"gaze"}"#]),
    )
    .await;

    assert_eq!(body["session"]["owner"], OWNER);
    assert!(body["session"]["aggregate"].is_null());
    assert_eq!(body["events_total"], 2);
    assert_eq!(body["events_skipped"], 0);

    let aggregates = body["aggregates"].as_array().unwrap();
    assert_eq!(aggregates.len(), 3);
    assert_eq!(aggregates[0]["key"]["kind"], "scene");
    assert_eq!(aggregates[0]["key"]["value"], "Forest");
    assert_eq!(aggregates[0]["action"], "created");
    assert_eq!(aggregates[0]["lines_added"], 2);
}

#[tokio::test]
async fn test_upload_without_marker_is_format_error() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .clone()
        .oneshot(owner_request(
            "POST",
            "/api/sessions/upload",
            OWNER,
            "{\"SessionName\": \"S1\"}",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "FORMAT_ERROR");

    let response = app
        .oneshot(owner_request("GET", "/api/sessions/all", OWNER, Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_upload_without_owner_is_unauthorized() {
    let app = setup_app(setup_test_db().await);

    let request = Request::builder()
        .method("POST")
        .uri("/api/sessions/upload")
        .body(Body::from(upload_body("Forest", &[])))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

// =============================================================================
// Listing and Lookup
// =============================================================================

#[tokio::test]
async fn test_list_sessions_is_scoped_to_owner() {
    let app = setup_app(setup_test_db().await);
    upload(&app, OWNER, upload_body("Forest", &[r#"{"StimulusType":1}"#])).await;
    upload(&app, "user-2", upload_body("Forest", &[])).await;

    let response = app
        .clone()
        .oneshot(owner_request("GET", "/api/sessions", OWNER, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    // Raw upload + scene + stimulus aggregates
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 100);
    assert_eq!(body["total_pages"], 1);
    let sessions = body["sessions"].as_array().unwrap();
    assert!(sessions.iter().all(|s| s["owner"] == OWNER));

    let response = app
        .oneshot(owner_request("GET", "/api/sessions/all", OWNER, Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total"], 5);
}

#[tokio::test]
async fn test_get_session_hides_other_owners() {
    let app = setup_app(setup_test_db().await);
    let uploaded = upload(&app, OWNER, upload_body("Forest", &[])).await;
    let id = uploaded["session"]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(owner_request("GET", &format!("/api/sessions/{}", id), OWNER, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["id"], id.as_str());

    let response = app
        .oneshot(owner_request("GET", &format!("/api/sessions/{}", id), "user-2", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_aggregates_with_filters() {
    let app = setup_app(setup_test_db().await);
    upload(
        &app,
        OWNER,
        upload_body("Forest", &[r#"{"StimulusType":1}"#, r#"{"Emotion":{"Label":3}}"#]),
    )
    .await;

    let response = app
        .clone()
        .oneshot(owner_request("GET", "/api/aggregates", OWNER, Body::empty()))
        .await
        .unwrap();
    let all = extract_json(response.into_body()).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let response = app
        .clone()
        .oneshot(owner_request(
            "GET",
            "/api/aggregates?kind=%23EMOTIONLABELSESSION&value=3",
            OWNER,
            Body::empty(),
        ))
        .await
        .unwrap();
    let filtered = extract_json(response.into_body()).await;
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["aggregate"]["kind"], "emotion_label");

    let response = app
        .oneshot(owner_request("GET", "/api/aggregates?kind=bogus", OWNER, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reaggregate_endpoint_reports_already_applied() {
    let app = setup_app(setup_test_db().await);
    let uploaded = upload(&app, OWNER, upload_body("Forest", &[r#"{"FeatureName":"gaze"}"#])).await;
    let id = uploaded["session"]["id"].as_str().unwrap();

    let response = app
        .oneshot(owner_request(
            "POST",
            &format!("/api/sessions/{}/reaggregate", id),
            OWNER,
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let aggregates = body["aggregates"].as_array().unwrap();
    assert_eq!(aggregates.len(), 2);
    assert!(aggregates.iter().all(|a| a["action"] == "already_applied"));
}

// =============================================================================
// Trackable Objects
// =============================================================================

#[tokio::test]
async fn test_trackable_objects_round_trip() {
    let app = setup_app(setup_test_db().await);
    let content = r#"{"Name":"Cube","Id":7}"#;

    let response = app
        .clone()
        .oneshot(owner_request("POST", "/api/trackable-objects/upload", OWNER, content))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(owner_request("GET", "/api/trackable-objects", OWNER, Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let objects = body.as_array().unwrap();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0]["content"], content);

    let response = app
        .oneshot(owner_request("GET", "/api/trackable-objects", "user-2", Body::empty()))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_trackable_object_rejected() {
    let app = setup_app(setup_test_db().await);

    let response = app
        .oneshot(owner_request("POST", "/api/trackable-objects/upload", OWNER, "  "))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Body Size Limit
// =============================================================================

#[tokio::test]
async fn test_body_size_limit() {
    let db = setup_test_db().await;
    let config = TomlConfig {
        max_upload_bytes: 1024,
        ..TomlConfig::default()
    };
    let app = build_router(AppState::new(db, &config));

    let filler = "x".repeat(2048);
    let large_body = upload_body("Forest", &[filler.as_str()]);
    let response = app
        .oneshot(owner_request("POST", "/api/sessions/upload", OWNER, large_body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
