//! JWT session token handling

use std::fmt;

use anyhow::{Result, anyhow};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT validation error
#[derive(Debug)]
pub enum JwtError {
    /// Token has expired
    Expired,
    /// Token signature is invalid
    InvalidSignature,
    /// Other validation error
    Invalid(String),
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => write!(f, "Session token has expired"),
            Self::InvalidSignature => write!(f, "Invalid session token signature"),
            Self::Invalid(msg) => write!(f, "Invalid session token: {}", msg),
        }
    }
}

impl std::error::Error for JwtError {}

/// JWT claims for dashboard session tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User ID
    pub sub: String,
    /// User email, carried so project ownership checks need no extra lookup
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl SessionClaims {
    pub fn new(user_id: &str, email: &str, expiration_hours: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::hours(expiration_hours as i64);

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Create a signed JWT session token
pub fn create_session_token(
    signing_key: &[u8],
    user_id: &str,
    email: &str,
    expiration_hours: u64,
) -> Result<String> {
    let claims = SessionClaims::new(user_id, email, expiration_hours);
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )
    .map_err(|e| anyhow!("Failed to create JWT: {}", e))
}

/// Validate and decode a JWT session token
pub fn validate_session_token(token: &str, signing_key: &[u8]) -> Result<SessionClaims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let token_data =
        decode::<SessionClaims>(token, &DecodingKey::from_secret(signing_key), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::Invalid(e.to_string()),
            })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> Vec<u8> {
        vec![7u8; 32]
    }

    #[test]
    fn test_create_and_validate() {
        let key = test_key();
        let token = create_session_token(&key, "u1", "dev@example.com", 24).unwrap();
        let claims = validate_session_token(&token, &key).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "dev@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_invalid_signature() {
        let token = create_session_token(&test_key(), "u1", "dev@example.com", 24).unwrap();
        let other_key = vec![9u8; 32];
        assert!(matches!(
            validate_session_token(&token, &other_key),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_token() {
        assert!(validate_session_token("not.a.jwt", &test_key()).is_err());
        assert!(validate_session_token("", &test_key()).is_err());
    }

    #[test]
    fn test_unique_jti() {
        let c1 = SessionClaims::new("u1", "a@example.com", 24);
        let c2 = SessionClaims::new("u1", "a@example.com", 24);
        assert_ne!(c1.jti, c2.jti);
    }
}
