use crate::api::{self, email::EmailWorkerConfig, handlers::auth::AuthConfig};
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub token_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub otp_ttl_seconds: i64,
    pub bcrypt_cost: u32,
    pub frontend_origin: String,
    pub outbox_poll_seconds: u64,
    pub outbox_max_attempts: u32,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.token_secret)
        .with_frontend_origin(args.frontend_origin)
        .with_session_ttl_seconds(args.token_ttl_seconds)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_bcrypt_cost(args.bcrypt_cost);

    let email_config = EmailWorkerConfig::new()
        .with_poll_interval_seconds(args.outbox_poll_seconds)
        .with_max_attempts(args.outbox_max_attempts);

    api::new(args.port, auth_config, email_config).await
}
