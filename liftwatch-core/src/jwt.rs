//! JWT helpers
//!
//! The backend issues stateless HS256 tokens that embed the user's id,
//! name and role. Clients treat tokens as opaque, with one exception:
//! [`peek_expiry`] reads the `exp` claim without checking the signature so
//! a restored session can be dropped once its token has obviously expired.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::User;

/// Default token lifetime: 24 hours
pub const DEFAULT_TOKEN_TTL: u64 = 24 * 60 * 60;

/// Claims embedded in issued tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub role: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

impl Claims {
    pub fn user(&self) -> User {
        User {
            id: self.user_id,
            username: self.username.clone(),
            role: self.role.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Token encoding failed: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Token has expired")]
    TokenExpired,
}

/// Token issuer/verifier held by the backend
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: u64, // seconds
}

impl JwtAuth {
    /// # Arguments
    /// * `secret` - HMAC secret (should be >= 32 bytes)
    /// * `ttl` - token lifetime in seconds (default: 86400 = 24 h)
    pub fn new(secret: &[u8], ttl: Option<u64>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: ttl.unwrap_or(DEFAULT_TOKEN_TTL),
        }
    }

    /// Issue a token for `user`
    pub fn generate_token(&self, user: &User) -> Result<String, TokenError> {
        let now = unix_now();

        let claims = Claims {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role.clone(),
            exp: now + self.ttl,
            iat: now,
        };

        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Verify signature and expiry
    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        if token_data.claims.exp < unix_now() {
            return Err(TokenError::TokenExpired);
        }

        Ok(token_data.claims)
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }
}

/// Unverified `exp` claim of a JWT, or `None` for opaque tokens
pub fn peek_expiry(token: &str) -> Option<u64> {
    #[derive(Deserialize)]
    struct ExpOnly {
        exp: u64,
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<ExpOnly>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp)
}

/// True when `token` is a JWT whose `exp` is already in the past
pub fn is_expired(token: &str) -> bool {
    peek_expiry(token).is_some_and(|exp| exp < unix_now())
}

/// Generate a secure random secret for JWT signing
pub fn generate_secret() -> [u8; 32] {
    use rand::Rng;
    rand::thread_rng().r#gen()
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
