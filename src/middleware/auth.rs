use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a UUID string.
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

/// Verified identity of the requester. Inserted as a request extension by
/// [`require_session`]; every core handler takes it as a parameter instead
/// of reading any ambient session state.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": "Not authenticated" })),
    )
        .into_response()
}

/// Pulls the session token from `Authorization: Bearer` or the `sid`
/// cookie. Shared with the `/me` route, which must not fail closed.
pub fn session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Some(token) = auth_header.to_str().ok().and_then(|s| s.strip_prefix("Bearer ")) {
            return Some(token.to_string());
        }
    }
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Resolves the session token (cookie `sid` or `Authorization: Bearer`)
/// into an [`AuthUser`] extension, failing closed with 401 before any
/// handler runs.
pub async fn require_session(mut req: Request, next: Next) -> Response {
    let Some(token) = session_token(req.headers()) else {
        return unauthorized();
    };

    match resolve_claims(&token) {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => unauthorized(),
    }
}

/// Decodes and validates a session token. Shared with the `/me` route,
/// which reports `authenticated: false` instead of failing.
pub fn resolve_claims(token: &str) -> Option<AuthUser> {
    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()?;
    let id = Uuid::parse_str(&data.claims.sub).ok()?;
    Some(AuthUser {
        id,
        username: data.claims.username,
    })
}
