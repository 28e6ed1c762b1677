//! OTP ledger: at most one pending code per email.
//!
//! Expiry is checked lazily when a code is presented; there is no background
//! sweep. An expired-but-unpresented entry simply sits in its slot until a
//! fresh issuance overwrites it.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::utils::codes_match;

/// A pending verification code and its deadline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpEntry {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of presenting a code for verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Code matched before the deadline; the entry has been consumed.
    Verified,
    /// No pending entry: never requested, already consumed, or restarted.
    Missing,
    /// Wrong code; the entry stays for another attempt.
    Mismatch,
    /// Deadline passed; the entry has been consumed.
    Expired,
}

#[derive(Debug, Default)]
pub struct OtpLedger {
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl OtpLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OtpEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a code, replacing any prior entry for the same email.
    pub fn issue(&self, email: &str, code: String, now: DateTime<Utc>, ttl: Duration) {
        self.lock().insert(
            email.to_string(),
            OtpEntry {
                code,
                expires_at: now + ttl,
            },
        );
    }

    /// Present a code. Consumes the entry on success or expiry detection;
    /// keeps it on mismatch. The mismatch check runs before the expiry check,
    /// matching the order the flow promises to clients.
    pub fn verify(&self, email: &str, code: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let mut entries = self.lock();

        let outcome = {
            let Some(entry) = entries.get(email) else {
                return VerifyOutcome::Missing;
            };
            if !codes_match(&entry.code, code) {
                return VerifyOutcome::Mismatch;
            }
            if now > entry.expires_at {
                VerifyOutcome::Expired
            } else {
                VerifyOutcome::Verified
            }
        };

        entries.remove(email);
        outcome
    }

    /// Pending entry for an email, if any.
    #[must_use]
    pub fn pending(&self, email: &str) -> Option<OtpEntry> {
        self.lock().get(email).cloned()
    }

    /// Number of pending entries across all emails.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttl() -> Duration {
        Duration::minutes(10)
    }

    #[test]
    fn issue_replaces_prior_entry() {
        let ledger = OtpLedger::new();
        let now = Utc::now();

        ledger.issue("a@x.com", "111111".to_string(), now, ttl());
        ledger.issue("a@x.com", "222222".to_string(), now, ttl());

        assert_eq!(ledger.len(), 1);
        assert_eq!(
            ledger.pending("a@x.com").map(|entry| entry.code),
            Some("222222".to_string())
        );
    }

    #[test]
    fn verify_consumes_entry_exactly_once() {
        let ledger = OtpLedger::new();
        let now = Utc::now();
        ledger.issue("a@x.com", "123456".to_string(), now, ttl());

        assert_eq!(ledger.verify("a@x.com", "123456", now), VerifyOutcome::Verified);
        assert_eq!(ledger.verify("a@x.com", "123456", now), VerifyOutcome::Missing);
        assert!(ledger.is_empty());
    }

    #[test]
    fn mismatch_keeps_entry_for_retry() {
        let ledger = OtpLedger::new();
        let now = Utc::now();
        ledger.issue("a@x.com", "123456".to_string(), now, ttl());

        assert_eq!(ledger.verify("a@x.com", "654321", now), VerifyOutcome::Mismatch);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.verify("a@x.com", "123456", now), VerifyOutcome::Verified);
    }

    #[test]
    fn expired_entry_is_consumed_on_detection() {
        let ledger = OtpLedger::new();
        let now = Utc::now();
        ledger.issue("a@x.com", "123456".to_string(), now, ttl());

        let late = now + Duration::minutes(11);
        assert_eq!(ledger.verify("a@x.com", "123456", late), VerifyOutcome::Expired);
        assert!(ledger.is_empty());
        assert_eq!(ledger.verify("a@x.com", "123456", late), VerifyOutcome::Missing);
    }

    #[test]
    fn wrong_code_on_expired_entry_reports_mismatch() {
        // The mismatch check runs first, so a wrong code never reveals
        // whether the entry had already expired, and the entry stays.
        let ledger = OtpLedger::new();
        let now = Utc::now();
        ledger.issue("a@x.com", "123456".to_string(), now, ttl());

        let late = now + Duration::minutes(11);
        assert_eq!(ledger.verify("a@x.com", "999999", late), VerifyOutcome::Mismatch);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn deadline_is_inclusive() {
        let ledger = OtpLedger::new();
        let now = Utc::now();
        ledger.issue("a@x.com", "123456".to_string(), now, ttl());

        // Exactly at the deadline the code is still accepted.
        let at_deadline = now + ttl();
        assert_eq!(
            ledger.verify("a@x.com", "123456", at_deadline),
            VerifyOutcome::Verified
        );
    }
}
