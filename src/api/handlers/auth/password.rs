//! Password hashing.
//!
//! bcrypt is deliberately slow; hashing and verification run on the blocking
//! pool so the request loop only suspends instead of stalling.

use anyhow::{Context, Result};

/// Hash a password with bcrypt at the given work factor.
///
/// # Errors
/// Returns an error if hashing fails or the blocking task is cancelled.
pub(super) async fn hash(password: String, cost: u32) -> Result<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")
}

/// Check a password against a stored hash.
///
/// Unparseable hashes count as a mismatch rather than an error so the login
/// response stays non-specific.
pub(super) async fn verify(password: String, hash: String) -> bool {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .ok()
        .and_then(Result::ok)
        .unwrap_or(false)
}
