//! Auth-related CLI arguments: token signing, OTP lifetime, hashing cost.

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL: &str = "token-ttl-seconds";
pub const ARG_OTP_TTL: &str = "otp-ttl-seconds";
pub const ARG_BCRYPT_COST: &str = "bcrypt-cost";
pub const ARG_FRONTEND_ORIGIN: &str = "frontend-origin";
pub const ARG_OUTBOX_POLL: &str = "outbox-poll-seconds";
pub const ARG_OUTBOX_MAX_ATTEMPTS: &str = "outbox-max-attempts";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign session tokens")
                .env("KONFIRMI_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL)
                .long(ARG_TOKEN_TTL)
                .help("Session token validity window in seconds")
                .default_value("86400")
                .env("KONFIRMI_TOKEN_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_OTP_TTL)
                .long(ARG_OTP_TTL)
                .help("OTP validity window in seconds")
                .default_value("600")
                .env("KONFIRMI_OTP_TTL_SECONDS")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_BCRYPT_COST)
                .long(ARG_BCRYPT_COST)
                .help("bcrypt work factor for new password hashes")
                .default_value("12")
                .env("KONFIRMI_BCRYPT_COST")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_ORIGIN)
                .long(ARG_FRONTEND_ORIGIN)
                .help("Origin allowed to call the API from a browser")
                .default_value("http://localhost:3000")
                .env("KONFIRMI_FRONTEND_ORIGIN"),
        )
        .arg(
            Arg::new(ARG_OUTBOX_POLL)
                .long(ARG_OUTBOX_POLL)
                .help("Email outbox poll interval in seconds")
                .default_value("5")
                .env("KONFIRMI_OUTBOX_POLL_SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_OUTBOX_MAX_ATTEMPTS)
                .long(ARG_OUTBOX_MAX_ATTEMPTS)
                .help("Delivery attempts before an email is dropped")
                .default_value("5")
                .env("KONFIRMI_OUTBOX_MAX_ATTEMPTS")
                .value_parser(clap::value_parser!(u32)),
        )
}

pub struct Options {
    pub token_secret: String,
    pub token_ttl_seconds: i64,
    pub otp_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub frontend_origin: String,
    pub outbox_poll_seconds: u64,
    pub outbox_max_attempts: u32,
}

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;

        let frontend_origin = matches
            .get_one::<String>(ARG_FRONTEND_ORIGIN)
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string());

        Ok(Self {
            token_secret,
            token_ttl_seconds: matches
                .get_one::<i64>(ARG_TOKEN_TTL)
                .copied()
                .unwrap_or(86_400),
            otp_ttl_seconds: matches.get_one::<i64>(ARG_OTP_TTL).copied().unwrap_or(600),
            bcrypt_cost: matches
                .get_one::<u32>(ARG_BCRYPT_COST)
                .copied()
                .unwrap_or(12),
            frontend_origin,
            outbox_poll_seconds: matches
                .get_one::<u64>(ARG_OUTBOX_POLL)
                .copied()
                .unwrap_or(5),
            outbox_max_attempts: matches
                .get_one::<u32>(ARG_OUTBOX_MAX_ATTEMPTS)
                .copied()
                .unwrap_or(5),
        })
    }
}
