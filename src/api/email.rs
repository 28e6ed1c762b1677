//! Email outbox worker and delivery abstractions.
//!
//! Register and login enqueue OTP messages into an in-memory outbox instead
//! of sending inside the request path. A background task drains due entries
//! and hands each one to an `EmailSender`. The sender decides how to deliver
//! (SMTP, API, etc.) and returns `Ok`/`Err`. Failed entries are retried with
//! exponential backoff and jitter until a max attempt threshold is reached,
//! then dropped with an error log.
//!
//! The default sender for local dev is `LogEmailSender`, which logs and
//! returns `Ok(())`. Poll interval and retry settings are configurable via
//! `EmailWorkerConfig`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};
use ulid::Ulid;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Render the OTP email queued by register and login.
#[must_use]
pub fn otp_message(to: &str, code: &str, expires_minutes: i64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("OTP Verification - {}", env!("CARGO_PKG_NAME")),
        html_body: format!(
            "<div style=\"font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;\">\
             <p>Your OTP verification code is:</p>\
             <h1 style=\"letter-spacing: 0.5rem; text-align: center;\">{code}</h1>\
             <p>This code will expire in {expires_minutes} minutes.</p>\
             <p>If you didn't request this code, please ignore this email.</p>\
             </div>"
        ),
    }
}

/// Email delivery abstraction used by the outbox worker.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error to schedule a retry.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "email outbox send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Debug)]
struct OutboxEntry {
    id: Ulid,
    message: EmailMessage,
    attempts: u32,
    next_attempt_at: DateTime<Utc>,
}

/// In-memory queue decoupling email delivery from the request path.
///
/// Handlers only enqueue; delivery success or failure never changes the
/// outcome of the request that queued the message.
#[derive(Debug, Default)]
pub struct Outbox {
    entries: Mutex<VecDeque<OutboxEntry>>,
}

impl Outbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<OutboxEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a message for delivery.
    ///
    /// The in-memory queue itself cannot fail; the fallible signature is the
    /// collaborator contract so a broker-backed implementation can slot in.
    ///
    /// # Errors
    /// Never fails for the in-memory implementation.
    pub fn enqueue(&self, message: EmailMessage) -> Result<()> {
        self.lock().push_back(OutboxEntry {
            id: Ulid::new(),
            message,
            attempts: 0,
            next_attempt_at: Utc::now(),
        });
        Ok(())
    }

    /// Number of messages waiting for delivery.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.lock().len()
    }

    /// Snapshot of queued messages, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<EmailMessage> {
        self.lock().iter().map(|entry| entry.message.clone()).collect()
    }

    /// Remove and return every entry that is due at `now`.
    fn take_due(&self, now: DateTime<Utc>) -> Vec<OutboxEntry> {
        let mut entries = self.lock();
        let mut due = Vec::new();
        let mut rest = VecDeque::with_capacity(entries.len());
        while let Some(entry) = entries.pop_front() {
            if entry.next_attempt_at <= now {
                due.push(entry);
            } else {
                rest.push_back(entry);
            }
        }
        *entries = rest;
        due
    }

    fn requeue(&self, entry: OutboxEntry) {
        self.lock().push_back(entry);
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EmailWorkerConfig {
    poll_interval: Duration,
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl EmailWorkerConfig {
    /// Default worker config: 5s poll interval, 5 max attempts, and 5s->5m
    /// exponential backoff with jitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_attempts: 5,
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
        }
    }

    #[must_use]
    pub fn with_poll_interval_seconds(mut self, seconds: u64) -> Self {
        self.poll_interval = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(mut self, seconds: u64) -> Self {
        self.backoff_base = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_backoff_max_seconds(mut self, seconds: u64) -> Self {
        self.backoff_max = Duration::from_secs(seconds);
        self
    }

    /// Clamp zero or inverted settings to workable values.
    #[must_use]
    pub fn normalize(self) -> Self {
        let poll_interval = if self.poll_interval.is_zero() {
            Duration::from_secs(1)
        } else {
            self.poll_interval
        };
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_secs(1)
        } else {
            self.backoff_base
        };
        let backoff_max = if self.backoff_max < backoff_base {
            backoff_base
        } else {
            self.backoff_max
        };
        Self {
            poll_interval,
            max_attempts: self.max_attempts.max(1),
            backoff_base,
            backoff_max,
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }
}

impl Default for EmailWorkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a background task that polls and processes the email outbox.
pub fn spawn_outbox_worker(
    outbox: Arc<Outbox>,
    sender: Arc<dyn EmailSender>,
    config: EmailWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = config.normalize();
        let poll_interval = config.poll_interval();

        loop {
            process_outbox_batch(&outbox, sender.as_ref(), &config);
            sleep(poll_interval).await;
        }
    })
}

/// Deliver every due entry once; reschedule or drop failures.
fn process_outbox_batch(
    outbox: &Outbox,
    sender: &dyn EmailSender,
    config: &EmailWorkerConfig,
) -> usize {
    let due = outbox.take_due(Utc::now());
    let count = due.len();

    for mut entry in due {
        if let Err(err) = sender.send(&entry.message) {
            entry.attempts = entry.attempts.saturating_add(1);
            if entry.attempts >= config.max_attempts() {
                error!(
                    id = %entry.id,
                    to = %entry.message.to,
                    attempts = entry.attempts,
                    "email delivery gave up: {err}"
                );
            } else {
                let delay = backoff_delay(entry.attempts, config.backoff_base(), config.backoff_max());
                let delay_ms = i64::try_from(delay.as_millis()).unwrap_or(i64::MAX);
                entry.next_attempt_at = Utc::now() + chrono::Duration::milliseconds(delay_ms);
                warn!(
                    id = %entry.id,
                    to = %entry.message.to,
                    attempts = entry.attempts,
                    "email delivery failed, retry scheduled: {err}"
                );
                outbox.requeue(entry);
            }
        }
    }

    count
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = if delay > max { max } else { delay };
    jitter_delay(capped)
}

fn jitter_delay(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FailingSender {
        calls: AtomicU32,
    }

    impl EmailSender for FailingSender {
        fn send(&self, _message: &EmailMessage) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("smtp down"))
        }
    }

    fn message(to: &str) -> EmailMessage {
        otp_message(to, "123456", 10)
    }

    #[test]
    fn otp_message_embeds_code_and_expiry() {
        let rendered = otp_message("a@x.com", "654321", 10);
        assert_eq!(rendered.to, "a@x.com");
        assert!(rendered.html_body.contains("654321"));
        assert!(rendered.html_body.contains("expire in 10 minutes"));
    }

    #[test]
    fn enqueue_increases_depth() -> Result<()> {
        let outbox = Outbox::new();
        assert_eq!(outbox.depth(), 0);
        outbox.enqueue(message("a@x.com"))?;
        outbox.enqueue(message("b@x.com"))?;
        assert_eq!(outbox.depth(), 2);

        let pending = outbox.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].to, "a@x.com");
        Ok(())
    }

    #[test]
    fn take_due_skips_future_entries() -> Result<()> {
        let outbox = Outbox::new();
        outbox.enqueue(message("a@x.com"))?;
        // Entries are due immediately when enqueued.
        let due = outbox.take_due(Utc::now());
        assert_eq!(due.len(), 1);
        assert_eq!(outbox.depth(), 0);

        // A rescheduled entry in the future must not be picked up.
        let mut entry = due.into_iter().next().map(Ok).unwrap_or_else(|| {
            Err(anyhow::anyhow!("missing due entry"))
        })?;
        entry.next_attempt_at = Utc::now() + chrono::Duration::minutes(5);
        outbox.requeue(entry);
        assert!(outbox.take_due(Utc::now()).is_empty());
        assert_eq!(outbox.depth(), 1);
        Ok(())
    }

    #[test]
    fn failed_delivery_is_rescheduled_then_dropped() -> Result<()> {
        let outbox = Outbox::new();
        let sender = FailingSender {
            calls: AtomicU32::new(0),
        };
        let config = EmailWorkerConfig::new()
            .with_max_attempts(2)
            .with_backoff_base_seconds(0)
            .normalize();

        outbox.enqueue(message("a@x.com"))?;

        // First attempt fails and reschedules.
        process_outbox_batch(&outbox, &sender, &config);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outbox.depth(), 1);

        // Force the retry to be due now, then exhaust attempts.
        let mut entries = outbox.take_due(Utc::now() + chrono::Duration::minutes(10));
        for entry in &mut entries {
            entry.next_attempt_at = Utc::now();
        }
        for entry in entries {
            outbox.requeue(entry);
        }
        process_outbox_batch(&outbox, &sender, &config);
        assert_eq!(sender.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outbox.depth(), 0);
        Ok(())
    }

    #[test]
    fn backoff_delay_grows_and_caps() {
        let base = Duration::from_secs(5);
        let max = Duration::from_secs(300);

        // Jitter keeps the delay within [half, full] of the capped value.
        let first = backoff_delay(1, base, max);
        assert!(first >= Duration::from_millis(2_500));
        assert!(first <= Duration::from_secs(5));

        let late = backoff_delay(30, base, max);
        assert!(late >= Duration::from_secs(150));
        assert!(late <= max);
    }

    #[test]
    fn normalize_clamps_zero_values() {
        let config = EmailWorkerConfig::new()
            .with_poll_interval_seconds(0)
            .with_max_attempts(0)
            .with_backoff_base_seconds(0)
            .with_backoff_max_seconds(0)
            .normalize();

        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.max_attempts(), 1);
        assert_eq!(config.backoff_base(), Duration::from_secs(1));
        assert_eq!(config.backoff_max(), Duration::from_secs(1));
    }
}
