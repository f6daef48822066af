use actix_web::{web, HttpResponse, HttpRequest};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use crate::AppState;
use crate::auth::{validate_credentials, UserIdentity};
use crate::error::AppError;
use tracing::{info, warn, debug};

/// Largest request body accepted by the auth routes.
pub const MAX_BODY_BYTES: usize = 32 * 1024;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserIdentity,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserIdentity,
}

pub async fn register(
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    issue_for_credentials("register", payload, &state).await
}

/// Identical to [`register`]: there is no user store, so a login is the same
/// derivation of identity from a well-formed username.
pub async fn login(
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    issue_for_credentials("login", payload, &state).await
}

pub async fn me(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_token(&req).ok_or(AppError::MissingBearer)?;

    let user = state.tokens.verify(token).map_err(|e| {
        warn!("Rejected bearer token: {}", e);
        e
    })?;

    Ok(HttpResponse::Ok().json(MeResponse { user }))
}

/// Extracts the token from an `Authorization: Bearer <token>` header. The
/// prefix is matched case-sensitively.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn issue_for_credentials(
    action: &str,
    payload: web::Payload,
    state: &AppState,
) -> Result<HttpResponse, AppError> {
    let input = read_json_body(payload).await?;

    let credentials = validate_credentials(&input).map_err(|errors| {
        debug!("Rejected {} request: {}", action, errors);
        errors
    })?;

    let user = UserIdentity::from_username(&credentials.username);
    let token = state.tokens.issue(&user)?;

    info!("{} successful for user {} ({})", action, user.username, user.id);
    Ok(HttpResponse::Ok().json(AuthResponse { token, user }))
}

/// Reads at most [`MAX_BODY_BYTES`] and parses them as JSON. An empty body is
/// treated as an empty object so it reaches validation.
async fn read_json_body(mut payload: web::Payload) -> Result<Value, AppError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BodyReadError(e.to_string()))?;
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(AppError::PayloadTooLarge);
        }
        body.extend_from_slice(&chunk);
    }

    if body.is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    Ok(serde_json::from_slice(&body)?)
}
