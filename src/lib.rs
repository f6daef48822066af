pub mod auth;
pub mod config;
pub mod error;

use std::sync::Arc;
use actix_cors::Cors;
use actix_web::{http::header, middleware::DefaultHeaders, web, HttpResponse};

pub use error::{AppError, TokenError};
pub type Result<T> = std::result::Result<T, AppError>;
pub use crate::config::Settings;

pub use auth::{TokenService, UserIdentity};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Fallback for any route that is not registered.
pub async fn not_found() -> Result<HttpResponse> {
    Err(AppError::NotFound)
}

/// Registers every route served by the application.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/auth/register", web::post().to(auth::handlers::register))
        .route("/auth/login", web::post().to(auth::handlers::login))
        .route("/auth/me", web::get().to(auth::handlers::me));
}

/// CORS policy allowing only the configured client origin.
pub fn cors(config: &crate::config::CorsConfig) -> Cors {
    Cors::default()
        .allowed_origin(&config.client_origin)
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(config.max_age)
}

pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-DNS-Prefetch-Control", "off"))
        .add(("Referrer-Policy", "no-referrer"))
        .add(("X-XSS-Protection", "0"))
        .add(("Permissions-Policy", "geolocation=(self)"))
}

/// Application state shared across all workers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(config: Settings) -> Result<Self> {
        let secret = config.signing_secret()?;
        let tokens = TokenService::new(secret.as_bytes(), config.auth.token_ttl_seconds)?;

        Ok(Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
        })
    }
}
