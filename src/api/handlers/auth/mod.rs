//! Auth handlers and supporting modules.
//!
//! This module coordinates the registration/login/verify-otp flow: credential
//! storage, time-bounded OTP issuance, and session token minting share one
//! in-memory `AuthState`.
//!
//! ## Verification lifecycle
//!
//! Register and login both finish by writing a fresh 6-digit code into the
//! OTP ledger (replacing any pending code for that email) and queueing its
//! delivery. Presenting the code consumes the ledger entry exactly once, on
//! success or on expiry detection; a mismatch leaves the entry in place for
//! another attempt. Only a successful verification flips the account's
//! verified flag and mints a session token.
//!
//! ## Enumeration
//!
//! Login answers an unknown email and a wrong password with the same status
//! and message so addresses cannot be probed. Verify errors are specific by
//! design: the caller already demonstrated intent to prove ownership of the
//! address.

mod clock;
mod error;
mod ledger;
pub(crate) mod login;
mod password;
pub(crate) mod register;
mod state;
mod store;
mod token;
pub(crate) mod types;
mod utils;
pub(crate) mod verify;

pub use clock::{Clock, SystemClock};
pub use error::{AuthFlowError, ErrorBody, FieldError};
pub use ledger::OtpLedger;
pub use state::{AuthConfig, AuthState};
pub use store::{Account, CredentialStore, InMemoryCredentialStore};
pub use token::{SessionClaims, mint_session_token, verify_session_token};
