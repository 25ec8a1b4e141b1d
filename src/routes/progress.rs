use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::quiz_dto::{ProgressQuery, ProgressResponse, ProgressUpdateRequest};
use crate::error::Error;
use crate::middleware::auth::AuthUser;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ProgressQuery>,
) -> crate::error::Result<Response> {
    let subject = query.subject.trim();
    if subject.is_empty() {
        return Err(Error::BadRequest("subject is required".to_string()));
    }

    let highest_unlocked = state.unlock.highest_unlocked(user.id, subject).await?;
    Ok(Json(ProgressResponse {
        success: true,
        subject: subject.to_string(),
        highest_unlocked,
    })
    .into_response())
}

/// Direct step-by-step unlock. Replays of an already-applied unlock are
/// no-ops that report the current value; skips are rejected with 400.
#[axum::debug_handler]
pub async fn post_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<ProgressUpdateRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let subject = req.subject.trim();
    if subject.is_empty() {
        return Err(Error::BadRequest("subject is required".to_string()));
    }

    let highest_unlocked = state
        .unlock
        .propose(user.id, subject, req.highest_unlocked)
        .await?;
    Ok(Json(ProgressResponse {
        success: true,
        subject: subject.to_string(),
        highest_unlocked,
    })
    .into_response())
}
