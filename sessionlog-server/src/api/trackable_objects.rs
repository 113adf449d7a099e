//! Trackable object API

use axum::{extract::State, http::StatusCode, Json};
use sessionlog_common::db::TrackableObject;

use crate::api::Owner;
use crate::db::trackable_objects;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/trackable-objects/upload
///
/// Stored verbatim; the body must not be blank.
pub async fn upload_trackable_object(
    State(state): State<AppState>,
    owner: Owner,
    body: String,
) -> ApiResult<(StatusCode, Json<TrackableObject>)> {
    if body.trim().is_empty() {
        return Err(ApiError::BadRequest("trackable object body is empty".to_string()));
    }

    let object =
        trackable_objects::insert_trackable_object(&state.db, owner.as_str(), &body).await?;
    tracing::info!(owner = owner.as_str(), object_id = %object.id, "Trackable object stored");

    Ok((StatusCode::CREATED, Json(object)))
}

/// GET /api/trackable-objects
pub async fn list_trackable_objects(
    State(state): State<AppState>,
    owner: Owner,
) -> ApiResult<Json<Vec<TrackableObject>>> {
    let objects = trackable_objects::list_by_owner(&state.db, owner.as_str()).await?;
    Ok(Json(objects))
}
