//! Authentication module for the Equinox Notes server
//!
//! This module handles credential validation, identity derivation,
//! and stateless bearer token issuance and verification.

pub mod handlers;
mod identity;
mod service;
mod validation;

pub use identity::{derive_user_id, UserIdentity};
pub use service::{Claims, TokenService, DEFAULT_TOKEN_TTL_SECONDS, TOKEN_AUDIENCE, TOKEN_ISSUER};
pub use validation::{validate_credentials, Credentials, Field, ValidationErrors};
