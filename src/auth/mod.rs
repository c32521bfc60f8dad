//! Bearer token verification.
//!
//! Tokens are base64-encoded JSON documents carrying the principal's email,
//! a display name and an ISO-8601 expiry. They are not signed.

use crate::catalog::CatalogError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Resolves a bearer token to the principal it was issued to.
pub trait TokenVerifier: Send + Sync {
    fn verify_token(&self, token: &str) -> Result<String, CatalogError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub email: String,
    pub username: String,
    /// Expiry, ISO-8601. Naive timestamps are read as UTC.
    pub exp: String,
}

impl TokenClaims {
    pub fn new(email: &str, username: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            email: email.to_string(),
            username: username.to_string(),
            exp: expires_at.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing three strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        STANDARD.encode(json)
    }
}

fn parse_expiry(exp: &str) -> Option<DateTime<Utc>> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(exp) {
        return Some(with_offset.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(exp, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Upper bound for the expiry leeway: one day.
pub const MAX_TOKEN_LEEWAY_SEC: u64 = 86_400;

#[derive(Debug, Clone, Default)]
pub struct Base64TokenVerifier {
    leeway: chrono::Duration,
}

impl Base64TokenVerifier {
    /// Leeways above [`MAX_TOKEN_LEEWAY_SEC`] are clamped to it.
    pub fn new(leeway_sec: u64) -> Self {
        let clamped = leeway_sec.min(MAX_TOKEN_LEEWAY_SEC) as i64;
        Self {
            leeway: chrono::Duration::try_seconds(clamped).unwrap_or_default(),
        }
    }

    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, CatalogError> {
        let unauthorized = |reason: &str| CatalogError::Unauthorized(reason.to_string());

        let token = token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token).trim();
        if token.is_empty() {
            return Err(unauthorized("missing token"));
        }

        let raw = STANDARD
            .decode(token)
            .map_err(|_| unauthorized("token is not valid base64"))?;
        let claims: TokenClaims = serde_json::from_slice(&raw).map_err(|err| {
            debug!("Rejecting token payload: {}", err);
            unauthorized("malformed token payload")
        })?;

        if claims.email.is_empty() {
            return Err(unauthorized("token has no principal"));
        }
        let expires_at =
            parse_expiry(&claims.exp).ok_or_else(|| unauthorized("unreadable token expiry"))?;
        if now > expires_at + self.leeway {
            return Err(unauthorized("token expired"));
        }

        Ok(claims.email)
    }
}

impl TokenVerifier for Base64TokenVerifier {
    fn verify_token(&self, token: &str) -> Result<String, CatalogError> {
        self.verify_token_at(token, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn accepts_valid_token() {
        let token = TokenClaims::new("u1@example.com", "u1", now() + Duration::days(2)).encode();
        let verifier = Base64TokenVerifier::default();
        assert_eq!(
            verifier.verify_token_at(&token, now()).unwrap(),
            "u1@example.com"
        );
        // Header form is accepted as well.
        assert!(verifier
            .verify_token_at(&format!("Bearer {}", token), now())
            .is_ok());
    }

    #[test]
    fn rejects_expired_token() {
        let token = TokenClaims::new("u1@example.com", "u1", now() - Duration::seconds(10)).encode();
        let err = Base64TokenVerifier::default()
            .verify_token_at(&token, now())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Unauthorized(_)));

        // Within the leeway it still passes.
        assert!(Base64TokenVerifier::new(30)
            .verify_token_at(&token, now())
            .is_ok());
    }

    #[test]
    fn huge_leeway_is_clamped() {
        let verifier = Base64TokenVerifier::new(u64::MAX);
        let stale = TokenClaims::new("u1@example.com", "u1", now() - Duration::days(2)).encode();
        assert!(verifier.verify_token_at(&stale, now()).is_err());

        let recent = TokenClaims::new("u1@example.com", "u1", now() - Duration::hours(23)).encode();
        assert!(verifier.verify_token_at(&recent, now()).is_ok());
    }

    #[test]
    fn reads_naive_and_offset_expiries() {
        let verifier = Base64TokenVerifier::default();
        for exp in ["2024-05-03T10:00:00.123456", "2024-05-03T10:00:00", "2024-05-03T10:00:00+02:00"] {
            let claims = TokenClaims {
                email: "u1@example.com".to_string(),
                username: "u1".to_string(),
                exp: exp.to_string(),
            };
            assert!(verifier.verify_token_at(&claims.encode(), now()).is_ok(), "{}", exp);
        }
    }

    #[test]
    fn rejects_garbage() {
        let verifier = Base64TokenVerifier::default();
        for token in ["", "Bearer ", "not base64!!", "aGVsbG8="] {
            let err = verifier.verify_token_at(token, now()).unwrap_err();
            assert!(matches!(err, CatalogError::Unauthorized(_)), "{}", token);
        }

        let no_email = TokenClaims::new("", "u1", now() + Duration::days(1)).encode();
        assert!(verifier.verify_token_at(&no_email, now()).is_err());

        let bad_exp = TokenClaims {
            email: "u1@example.com".to_string(),
            username: "u1".to_string(),
            exp: "tomorrow".to_string(),
        };
        assert!(verifier.verify_token_at(&bad_exp.encode(), now()).is_err());
    }
}
