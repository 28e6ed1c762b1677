//! Auth configuration and shared state.

use chrono::Duration;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::error;

use crate::api::email::{Outbox, otp_message};

use super::clock::Clock;
use super::error::AuthFlowError;
use super::ledger::OtpLedger;
use super::store::CredentialStore;
use super::utils::generate_otp;

const DEFAULT_OTP_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_BCRYPT_COST: u32 = 12;
const DEFAULT_FRONTEND_ORIGIN: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_secret: SecretString,
    frontend_origin: String,
    otp_ttl_seconds: i64,
    session_ttl_seconds: i64,
    bcrypt_cost: u32,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            frontend_origin: DEFAULT_FRONTEND_ORIGIN.to_string(),
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    #[must_use]
    pub fn with_frontend_origin(mut self, origin: String) -> Self {
        self.frontend_origin = origin;
        self
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub(crate) fn frontend_origin(&self) -> &str {
        &self.frontend_origin
    }

    pub(super) fn token_secret(&self) -> &SecretString {
        &self.token_secret
    }

    pub(super) fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

/// Shared state for the auth handlers: configuration plus the credential
/// store, OTP ledger, email outbox, and clock.
pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn CredentialStore>,
    ledger: OtpLedger,
    outbox: Arc<Outbox>,
    clock: Arc<dyn Clock>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn CredentialStore>,
        ledger: OtpLedger,
        outbox: Arc<Outbox>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            ledger,
            outbox,
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn store(&self) -> &dyn CredentialStore {
        self.store.as_ref()
    }

    pub(super) fn ledger(&self) -> &OtpLedger {
        &self.ledger
    }

    pub(super) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Issue a fresh code for an email and queue its delivery. A prior
    /// pending code for the same address is replaced.
    pub(super) fn issue_otp(&self, email: &str) -> Result<(), AuthFlowError> {
        let code = generate_otp();
        let now = self.clock.now();
        let ttl_seconds = self.config.otp_ttl_seconds();
        self.ledger
            .issue(email, code.clone(), now, Duration::seconds(ttl_seconds));

        let message = otp_message(email, &code, ttl_seconds / 60);
        self.outbox.enqueue(message).map_err(|err| {
            error!("Failed to enqueue OTP email: {err}");
            AuthFlowError::EmailDispatch
        })
    }
}
