use crate::auth::identity::UserIdentity;
use crate::error::{AppError, TokenError};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_AUDIENCE: &str = "equinox";
pub const TOKEN_ISSUER: &str = "equinox-server";
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Serialize)]
struct Header {
    alg: &'static str,
    typ: &'static str,
}

const HEADER: Header = Header {
    alg: "HS256",
    typ: "JWT",
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // User ID
    pub username: String,
    pub aud: String,
    pub iss: String,
    pub exp: i64,         // Expiration time
}

/// Issues and verifies HS256 bearer tokens.
///
/// Holds no session state: the signature is the only thing trusted, so one
/// instance can be shared across workers behind an `Arc`.
pub struct TokenService {
    mac: HmacSha256,
    ttl_seconds: i64,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl_seconds: i64) -> Result<Self, AppError> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|e| AppError::ConfigError(format!("Invalid signing secret: {}", e)))?;

        Ok(Self { mac, ttl_seconds })
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    pub fn issue(&self, identity: &UserIdentity) -> Result<String, AppError> {
        self.issue_at(identity, Utc::now().timestamp())
    }

    /// Issues a token as if the clock read `now` (unix seconds).
    pub fn issue_at(&self, identity: &UserIdentity, now: i64) -> Result<String, AppError> {
        let claims = Claims {
            sub: identity.id.clone(),
            username: identity.username.clone(),
            aud: TOKEN_AUDIENCE.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            exp: now + self.ttl_seconds,
        };

        self.sign(&claims)
    }

    pub fn verify(&self, token: &str) -> Result<UserIdentity, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verifies `token` against the clock reading `now` (unix seconds).
    ///
    /// The signature is checked before any claim is decoded.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<UserIdentity, TokenError> {
        let segments: Vec<&str> = token.split('.').collect();
        let &[header, payload, signature] = segments.as_slice() else {
            return Err(TokenError::MalformedToken);
        };

        let provided = BASE64URL
            .decode(signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        // verify_slice rejects a length mismatch and compares in constant time
        self.mac_over(header, payload)
            .verify_slice(&provided)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Value = BASE64URL
            .decode(payload)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .ok_or(TokenError::MalformedToken)?;

        if let Some(exp) = claims.get("exp").and_then(Value::as_f64) {
            if exp < now as f64 {
                return Err(TokenError::TokenExpired);
            }
        }

        let aud = claims.get("aud").and_then(Value::as_str);
        let iss = claims.get("iss").and_then(Value::as_str);
        if aud != Some(TOKEN_AUDIENCE) || iss != Some(TOKEN_ISSUER) {
            return Err(TokenError::InvalidAudienceOrIssuer);
        }

        match (
            claims.get("sub").and_then(Value::as_str),
            claims.get("username").and_then(Value::as_str),
        ) {
            (Some(sub), Some(username)) => Ok(UserIdentity {
                id: sub.to_string(),
                username: username.to_string(),
            }),
            _ => Err(TokenError::InvalidPayload),
        }
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        let header = serde_json::to_vec(&HEADER)
            .map_err(|e| AppError::InternalError(e.to_string()))?;
        let payload = serde_json::to_vec(claims)
            .map_err(|e| AppError::InternalError(e.to_string()))?;

        let header = BASE64URL.encode(header);
        let payload = BASE64URL.encode(payload);
        let signature = BASE64URL.encode(self.mac_over(&header, &payload).finalize().into_bytes());

        Ok(format!("{}.{}.{}", header, payload, signature))
    }

    fn mac_over(&self, header: &str, payload: &str) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_750_000_000;

    fn service() -> TokenService {
        TokenService::new(b"test_secret", DEFAULT_TOKEN_TTL_SECONDS).unwrap()
    }

    fn identity() -> UserIdentity {
        UserIdentity::from_username("night_owl")
    }

    fn segments(token: &str) -> Vec<String> {
        token.split('.').map(str::to_string).collect()
    }

    fn replace_char(segment: &str, index: usize) -> String {
        segment
            .char_indices()
            .map(|(i, c)| match (i == index, c) {
                (true, 'A') => 'B',
                (true, _) => 'A',
                (false, c) => c,
            })
            .collect()
    }

    #[test_log::test]
    fn test_round_trip() {
        let service = service();
        let token = service.issue_at(&identity(), NOW).unwrap();
        assert_eq!(service.verify_at(&token, NOW).unwrap(), identity());
        assert_eq!(service.verify_at(&token, NOW + DEFAULT_TOKEN_TTL_SECONDS).unwrap(), identity());
    }

    #[test]
    fn test_round_trip_with_wall_clock() {
        let service = service();
        let token = service.issue(&identity()).unwrap();
        assert_eq!(service.verify(&token).unwrap(), identity());
    }

    #[test]
    fn test_token_layout() {
        let token = service().issue_at(&identity(), NOW).unwrap();
        let parts = segments(&token);
        assert_eq!(parts.len(), 3);

        let header: Value = serde_json::from_slice(&BASE64URL.decode(&parts[0]).unwrap()).unwrap();
        assert_eq!(header, json!({ "alg": "HS256", "typ": "JWT" }));

        let claims: Claims = serde_json::from_slice(&BASE64URL.decode(&parts[1]).unwrap()).unwrap();
        assert_eq!(
            claims,
            Claims {
                sub: identity().id,
                username: "night_owl".to_string(),
                aud: "equinox".to_string(),
                iss: "equinox-server".to_string(),
                exp: NOW + 604_800,
            }
        );
        assert!(!token.contains('='));
    }

    #[test]
    fn test_issue_is_deterministic() {
        let service = service();
        let first = service.issue_at(&identity(), NOW).unwrap();
        let second = service.issue_at(&identity(), NOW).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_shape() {
        let service = service();
        assert_eq!(service.verify_at("not-a-token", NOW), Err(TokenError::MalformedToken));
        assert_eq!(service.verify_at("a.b", NOW), Err(TokenError::MalformedToken));
        assert_eq!(service.verify_at("a.b.c.d", NOW), Err(TokenError::MalformedToken));
        assert_eq!(service.verify_at("", NOW), Err(TokenError::MalformedToken));
    }

    #[test]
    fn test_signature_tamper_detected() {
        let service = service();
        let token = service.issue_at(&identity(), NOW).unwrap();
        let parts = segments(&token);

        for index in 0..parts[2].len() {
            let forged = format!("{}.{}.{}", parts[0], parts[1], replace_char(&parts[2], index));
            assert_eq!(
                service.verify_at(&forged, NOW),
                Err(TokenError::InvalidSignature),
                "signature char {} flipped",
                index
            );
        }
    }

    #[test]
    fn test_payload_tamper_detected() {
        let service = service();
        let token = service.issue_at(&identity(), NOW).unwrap();
        let parts = segments(&token);

        for index in 0..parts[1].len() {
            let forged = format!("{}.{}.{}", parts[0], replace_char(&parts[1], index), parts[2]);
            assert_eq!(
                service.verify_at(&forged, NOW),
                Err(TokenError::InvalidSignature),
                "payload char {} flipped",
                index
            );
        }
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let service = service();
        let token = service.issue_at(&identity(), NOW).unwrap();
        let parts = segments(&token);

        let short = format!("{}.{}.{}", parts[0], parts[1], &parts[2][..20]);
        assert_eq!(service.verify_at(&short, NOW), Err(TokenError::InvalidSignature));

        let empty = format!("{}.{}.", parts[0], parts[1]);
        assert_eq!(service.verify_at(&empty, NOW), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_other_secret_rejected() {
        let token = service().issue_at(&identity(), NOW).unwrap();
        let other = TokenService::new(b"another_secret", DEFAULT_TOKEN_TTL_SECONDS).unwrap();
        assert_eq!(other.verify_at(&token, NOW), Err(TokenError::InvalidSignature));
    }

    #[test_log::test]
    fn test_expired_token() {
        let service = service();
        let token = service
            .issue_at(&identity(), NOW - DEFAULT_TOKEN_TTL_SECONDS - 1)
            .unwrap();
        assert_eq!(service.verify_at(&token, NOW), Err(TokenError::TokenExpired));
    }

    #[test]
    fn test_missing_exp_is_accepted() {
        let service = service();
        let token = service
            .sign(&json!({
                "sub": "0123456789abcdef",
                "username": "night_owl",
                "aud": TOKEN_AUDIENCE,
                "iss": TOKEN_ISSUER,
            }))
            .unwrap();
        assert_eq!(service.verify_at(&token, NOW).unwrap().username, "night_owl");
    }

    #[test]
    fn test_wrong_audience_or_issuer() {
        let service = service();
        for (aud, iss) in [("other", TOKEN_ISSUER), (TOKEN_AUDIENCE, "other"), ("", "")] {
            let token = service
                .sign(&json!({
                    "sub": "0123456789abcdef",
                    "username": "night_owl",
                    "aud": aud,
                    "iss": iss,
                    "exp": NOW + 60,
                }))
                .unwrap();
            assert_eq!(
                service.verify_at(&token, NOW),
                Err(TokenError::InvalidAudienceOrIssuer)
            );
        }
    }

    #[test]
    fn test_expiry_checked_before_audience() {
        let service = service();
        let token = service
            .sign(&json!({ "aud": "other", "exp": NOW - 1 }))
            .unwrap();
        assert_eq!(service.verify_at(&token, NOW), Err(TokenError::TokenExpired));
    }

    #[test]
    fn test_non_string_subject() {
        let service = service();
        let token = service
            .sign(&json!({
                "sub": 42,
                "username": "night_owl",
                "aud": TOKEN_AUDIENCE,
                "iss": TOKEN_ISSUER,
                "exp": NOW + 60,
            }))
            .unwrap();
        assert_eq!(service.verify_at(&token, NOW), Err(TokenError::InvalidPayload));
    }

    #[test]
    fn test_signed_garbage_payload() {
        let service = service();
        let header = BASE64URL.encode(b"{}");
        let payload = BASE64URL.encode(b"not json");
        let signature = BASE64URL.encode(service.mac_over(&header, &payload).finalize().into_bytes());
        let token = format!("{}.{}.{}", header, payload, signature);
        assert_eq!(service.verify_at(&token, NOW), Err(TokenError::MalformedToken));
    }
}
