//! Credential validation for the register and login routes.
//!
//! Both fields are always checked and every violated rule is reported, so a
//! client can fix all of its input in one round trip.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 24;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 72;

/// A validated username/password pair. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Trimmed username.
    pub username: String,
    /// Password exactly as submitted.
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Username,
    Password,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Username => f.write_str("username"),
            Field::Password => f.write_str("password"),
        }
    }
}

/// Field name to ordered messages. Fields without violations are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<Field, Vec<String>>);

impl ValidationErrors {
    fn push(&mut self, field: Field, message: &str) {
        self.0.entry(field).or_default().push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<&[String]> {
        self.0.get(&field).map(Vec::as_slice)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn check_username(raw: Option<&Value>, errors: &mut ValidationErrors) -> Option<String> {
    let username = match raw.and_then(Value::as_str).map(str::trim) {
        Some(username) if !username.is_empty() => username,
        _ => {
            errors.push(Field::Username, "Username is required");
            return None;
        }
    };

    let len = username.chars().count();
    let mut valid = true;
    if len < USERNAME_MIN_LEN {
        errors.push(Field::Username, "Username must be at least 3 characters");
        valid = false;
    }
    if len > USERNAME_MAX_LEN {
        errors.push(Field::Username, "Username must be at most 24 characters");
        valid = false;
    }
    if !username.chars().all(is_username_char) {
        errors.push(Field::Username, "Username must be alphanumeric or underscore");
        valid = false;
    }

    valid.then(|| username.to_string())
}

fn check_password(raw: Option<&Value>, errors: &mut ValidationErrors) -> Option<String> {
    let password = match raw.and_then(Value::as_str) {
        Some(password) if !password.is_empty() => password,
        _ => {
            errors.push(Field::Password, "Password is required");
            return None;
        }
    };

    let len = password.chars().count();
    let mut valid = true;
    if len < PASSWORD_MIN_LEN {
        errors.push(Field::Password, "Password must be at least 8 characters");
        valid = false;
    }
    if len > PASSWORD_MAX_LEN {
        errors.push(Field::Password, "Password must be at most 72 characters");
        valid = false;
    }

    valid.then(|| password.to_string())
}

/// Validates an arbitrary request body.
///
/// Anything other than a JSON object fails both fields with a "required"
/// message. On success the username is trimmed and the password is returned
/// untouched.
pub fn validate_credentials(input: &Value) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let Some(object) = input.as_object() else {
        errors.push(Field::Username, "Username is required");
        errors.push(Field::Password, "Password is required");
        return Err(errors);
    };

    let username = check_username(object.get("username"), &mut errors);
    let password = check_password(object.get("password"), &mut errors);

    match (username, password) {
        (Some(username), Some(password)) if errors.is_empty() => {
            Ok(Credentials { username, password })
        }
        _ => Err(errors),
    }
}
