use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use tracing::warn;

use crate::auth::DEFAULT_TOKEN_TTL_SECONDS;
use crate::error::AppError;

/// Signing secret used outside production when none is configured. Tokens
/// signed with it are forgeable by anyone who has read this file.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_seconds: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub client_origin: String,
    pub max_age: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Self::with_defaults(Config::builder(), "development")?
            // Add in settings from the config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))

            // E.g., `APP_SERVER__PORT=5001` would set `Settings.server.port`
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
            )

            // Unprefixed variables used by existing deployments
            .set_override_option("auth.jwt_secret", env::var("JWT_SECRET").ok())?
            .set_override_option("server.port", env::var("PORT").ok())?
            .set_override_option("cors.client_origin", env::var("CLIENT_ORIGIN").ok())?
            .build()?;

        s.try_deserialize()
    }

    pub fn new_for_test() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder(), "test")?
            .set_override("auth.jwt_secret", "test_secret")?
            .build()?
            .try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("environment", environment)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5174)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("auth.token_ttl_seconds", DEFAULT_TOKEN_TTL_SECONDS)?
            .set_default("cors.client_origin", "http://localhost:5173")?
            .set_default("cors.max_age", 600)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// The HMAC secret for signing tokens.
    ///
    /// A missing secret is fatal in production. Elsewhere the development
    /// default is returned with a warning.
    pub fn signing_secret(&self) -> Result<String, AppError> {
        match self.auth.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret.to_string()),
            _ if self.is_production() => Err(AppError::ConfigError(
                "auth.jwt_secret must be set in production".into(),
            )),
            _ => {
                warn!(
                    "No JWT secret configured, falling back to the development default; \
                     tokens are forgeable"
                );
                Ok(DEV_JWT_SECRET.to_string())
            }
        }
    }
}
