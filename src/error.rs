use thiserror::Error;
use actix_web::{ResponseError, HttpResponse, http::StatusCode};
use serde_json::json;

use crate::auth::ValidationErrors;

/// Message returned for every rejected bearer token, whatever the cause.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or expired token";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Token error: {0}")]
    TokenError(#[from] TokenError),

    #[error("Missing or malformed authorization header")]
    MissingBearer,

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Invalid JSON body")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unable to read request body")]
    BodyReadError(String),

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Not found")]
    NotFound,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(err.to_string())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = match self {
            AppError::ValidationError(errors) => json!({ "error": errors }),
            AppError::TokenError(_) | AppError::MissingBearer => {
                json!({ "error": UNAUTHORIZED_MESSAGE })
            }
            AppError::ConfigError(_) | AppError::InternalError(_) => {
                json!({ "error": "Internal server error" })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(status).json(response)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::TokenError(_) | AppError::MissingBearer => StatusCode::UNAUTHORIZED,
            AppError::ValidationError(_)
            | AppError::InvalidJson(_)
            | AppError::BodyReadError(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ConfigError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Reasons a bearer token is rejected. Kept distinct for logs only; callers
/// always see [`UNAUTHORIZED_MESSAGE`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid audience or issuer")]
    InvalidAudienceOrIssuer,

    #[error("Invalid payload")]
    InvalidPayload,
}
