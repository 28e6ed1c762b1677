//! Session token minting and validation.
//!
//! Minting is a pure function of claims, secret, and expiry so it can be
//! unit-tested in isolation from the handlers. Tokens are `HS256` JWTs; any
//! downstream service holding the shared secret can validate signature and
//! expiry and extract the identity claims.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Identity claims embedded in a session token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionClaims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub email: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a session token for a verified account.
///
/// # Errors
/// Returns an error if signing fails.
pub fn mint_session_token(
    user_id: i64,
    email: &str,
    role: &str,
    secret: &SecretString,
    issued_at: DateTime<Utc>,
    ttl: Duration,
) -> Result<String> {
    let claims = SessionClaims {
        user_id,
        email: email.to_string(),
        role: role.to_string(),
        iat: issued_at.timestamp(),
        exp: (issued_at + ttl).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .context("failed to sign session token")
}

/// Validate signature and expiry, returning the embedded claims.
///
/// # Errors
/// Returns an error if the signature is invalid or the token has expired.
pub fn verify_session_token(token: &str, secret: &SecretString) -> Result<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .context("invalid session token")
}
