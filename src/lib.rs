//! # Konfirmi (email OTP verification authority)
//!
//! `konfirmi` is a registration/login service backed by one-time-password
//! email verification. Accounts are created unverified; proving control of
//! the email address through a 6-digit code is what flips them to verified
//! and mints a signed session token.
//!
//! ## Verification lifecycle
//!
//! Register and login both end the same way: a fresh code is written into
//! the OTP ledger (replacing any pending code for that address) and an email
//! is queued for delivery. Presenting the code at `/api/auth/verify-otp`
//! consumes the ledger entry exactly once, on success or on expiry
//! detection. A mismatched code leaves the entry in place for another
//! attempt. Expiry is checked lazily at verification time; there is no
//! background sweep.
//!
//! ## Session tokens
//!
//! Verification answers with an `HS256` JWT embedding the account id, email,
//! and role, valid for 24 hours. Downstream services validate signature and
//! expiry with the shared secret; no session state is kept server-side.
//!
//! ## Storage
//!
//! Both the credential store and the OTP ledger are process-local in-memory
//! maps behind injected abstractions. Uniqueness checks and OTP issuance are
//! conditional operations performed under one critical section, so two
//! concurrent registrations for the same email or username cannot both
//! succeed. Nothing survives a restart.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
