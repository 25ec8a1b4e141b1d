use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::dto::auth_dto::{
    GoogleSignInRequest, LoginRequest, PublicUser, RegisterRequest, SessionResponse,
};
use crate::error::Error;
use crate::middleware::auth::{resolve_claims, session_token, AuthUser, SESSION_COOKIE};
use crate::models::user::User;
use crate::AppState;

fn session_response(
    state: &AppState,
    user: &User,
    message: &str,
) -> crate::error::Result<Response> {
    let token = state.auth_service.issue_session(user)?;
    let config = crate::config::get_config();
    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        config.session_ttl_days * 86_400
    );

    let mut response = Json(SessionResponse {
        success: true,
        message: message.to_string(),
        user: PublicUser::from(user),
    })
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| Error::Internal(format!("Invalid session cookie: {}", e)))?,
    );
    Ok(response)
}

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user = state
        .auth_service
        .register(&req.username, &req.email, &req.password)
        .await?;
    session_response(&state, &user, "Account created successfully!")
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user = state.auth_service.login(&req.username, &req.password).await?;
    session_response(&state, &user, "Login successful!")
}

#[axum::debug_handler]
pub async fn google_sign_in(
    State(state): State<AppState>,
    Json(req): Json<GoogleSignInRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user = state.auth_service.google_sign_in(&req.id_token).await?;
    session_response(&state, &user, "Login successful!")
}

#[axum::debug_handler]
pub async fn logout() -> Response {
    let cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
    let mut response = Json(json!({
        "success": true,
        "message": "Logged out successfully"
    }))
    .into_response();
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

/// Session probe: reports `authenticated: false` instead of 401 so the
/// client can render the logged-out state without an error path.
#[axum::debug_handler]
pub async fn me(headers: HeaderMap) -> Response {
    let user = session_token(&headers).and_then(|token| resolve_claims(&token));
    match user {
        Some(user) => Json(json!({
            "authenticated": true,
            "user": { "id": user.id, "username": user.username }
        }))
        .into_response(),
        None => Json(json!({ "authenticated": false })).into_response(),
    }
}

#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> crate::error::Result<Response> {
    let record = state.auth_service.find_by_id(user.id).await?;
    Ok(Json(json!({
        "success": true,
        "user": PublicUser::from(&record)
    }))
    .into_response())
}
