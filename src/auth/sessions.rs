/**
 * Session Claims and JWT Validation
 *
 * This module handles session token validation for WebSocket
 * connections. Tokens are JWTs issued by the application server; the
 * gateway only validates them, it never issues them (the `create_token`
 * helper exists for tests and local development).
 */

use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::RealtimeError;

/// Session claims carried by a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    /// Email
    pub email: String,
    /// Session record ID, when the issuer tracks sessions server-side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at time (Unix timestamp)
    pub iat: u64,
}

/// Session validation service
///
/// # Result Semantics
///
/// - `Ok(Some(claims))` - the session is valid
/// - `Ok(None)` - definitive denial (invalid, expired, revoked)
/// - `Err(_)` - transient failure; the check could not be performed
#[async_trait]
pub trait SessionService: Send + Sync {
    /// Validate a session token
    async fn validate_session(&self, token: &str)
        -> Result<Option<SessionClaims>, RealtimeError>;
}

/// JWT-backed session service
///
/// Validation is local (signature + expiry), so this implementation
/// never returns a transient error: every failure is a definitive
/// `Ok(None)`.
pub struct JwtSessionService {
    secret: String,
}

impl JwtSessionService {
    /// Create a session service validating against the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl SessionService for JwtSessionService {
    async fn validate_session(
        &self,
        token: &str,
    ) -> Result<Option<SessionClaims>, RealtimeError> {
        let key = DecodingKey::from_secret(self.secret.as_ref());
        let validation = Validation::default();

        match decode::<SessionClaims>(token, &key, &validation) {
            Ok(data) => Ok(Some(data.claims)),
            Err(e) => {
                tracing::debug!("[Session] Token rejected: {:?}", e.kind());
                Ok(None)
            }
        }
    }
}

/// Create a session token
///
/// Used by tests and local development; production tokens are issued
/// by the application server.
///
/// # Arguments
/// * `secret` - Signing secret (must match the validating service)
/// * `user_id` - User ID for the `sub` claim
/// * `email` - User email
/// * `sid` - Optional server-side session record ID
pub fn create_token(
    secret: &str,
    user_id: &str,
    email: &str,
    sid: Option<String>,
) -> Result<String, RealtimeError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| RealtimeError::session(format!("System clock error: {e}")))?
        .as_secs();

    let claims = SessionClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        sid,
        exp: now + 24 * 60 * 60,
        iat: now,
    };

    let key = EncodingKey::from_secret(secret.as_ref());
    encode(&Header::default(), &claims, &key)
        .map_err(|e| RealtimeError::session(format!("Token encoding failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SECRET: &str = "test-secret";

    #[tokio::test]
    async fn test_valid_token_round_trip() {
        let token = create_token(SECRET, "user-1", "test@example.com", None).unwrap();
        let service = JwtSessionService::new(SECRET);

        let claims = service.validate_session(&token).await.unwrap();
        let claims = claims.expect("token should validate");
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "test@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn test_session_id_claim_preserved() {
        let token =
            create_token(SECRET, "user-1", "test@example.com", Some("sess-9".into())).unwrap();
        let service = JwtSessionService::new(SECRET);

        let claims = service.validate_session(&token).await.unwrap().unwrap();
        assert_eq!(claims.sid.as_deref(), Some("sess-9"));
    }

    #[tokio::test]
    async fn test_garbage_token_is_definitive_denial() {
        let service = JwtSessionService::new(SECRET);
        let result = service.validate_session("not.a.token").await;
        // Definitive denial, not a transient error.
        assert_matches!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_definitive_denial() {
        let token = create_token(SECRET, "user-1", "test@example.com", None).unwrap();
        let service = JwtSessionService::new("a-different-secret");
        assert_matches!(service.validate_session(&token).await, Ok(None));
    }
}
