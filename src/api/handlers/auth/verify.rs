//! OTP verification endpoint.
//!
//! The only path that marks an account verified and mints a session token.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::error::{self, AuthFlowError, ErrorBody, FieldError};
use super::ledger::VerifyOutcome;
use super::state::AuthState;
use super::token::mint_session_token;
use super::types::{VerifiedResponse, VerifyOtpRequest};
use super::utils::{normalize_email, valid_email, valid_otp_format};

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account verified; session token issued", body = VerifiedResponse),
        (status = 400, description = "Validation failure, missing, wrong, or expired OTP", body = ErrorBody),
        (status = 404, description = "No account for this email", body = ErrorBody),
        (status = 500, description = "Unexpected fault", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_otp(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> impl IntoResponse {
    let request: VerifyOtpRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error::missing_payload(),
    };

    match handle(&state, &request) {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn handle(state: &AuthState, request: &VerifyOtpRequest) -> Result<VerifiedResponse, AuthFlowError> {
    let email = normalize_email(&request.email);
    validate(request, &email)?;

    let Some(account) = state.store().find_by_email(&email) else {
        return Err(AuthFlowError::AccountNotFound);
    };

    match state.ledger().verify(&email, &request.otp, state.clock().now()) {
        VerifyOutcome::Verified => {}
        VerifyOutcome::Missing => return Err(AuthFlowError::OtpMissing),
        VerifyOutcome::Mismatch => return Err(AuthFlowError::OtpMismatch),
        VerifyOutcome::Expired => return Err(AuthFlowError::OtpExpired),
    }

    state.store().mark_verified(&email);
    debug!(id = account.id, "account verified");

    let token = mint_session_token(
        account.id,
        &account.email,
        &account.role,
        state.config().token_secret(),
        state.clock().now(),
        Duration::seconds(state.config().session_ttl_seconds()),
    )
    .map_err(|err| {
        error!("Failed to sign session token: {err}");
        AuthFlowError::Internal("OTP verification failed".to_string())
    })?;

    Ok(VerifiedResponse {
        success: true,
        message: "OTP verified successfully".to_string(),
        token,
        user: account.public(),
    })
}

fn validate(request: &VerifyOtpRequest, email: &str) -> Result<(), AuthFlowError> {
    let mut errors = Vec::new();

    if !valid_email(email) {
        errors.push(FieldError::new("email", "Valid email is required"));
    }
    if !valid_otp_format(&request.otp) {
        errors.push(FieldError::new("otp", "OTP must be 6 digits"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthFlowError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::support::test_state;
    use super::super::types::VerifyOtpRequest;
    use super::verify_otp;
    use anyhow::Result;
    use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn verify_missing_payload() {
        let (state, _clock) = test_state();
        let response = verify_otp(Extension(state), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verify_rejects_malformed_otp() -> Result<()> {
        let (state, _clock) = test_state();
        let response = verify_otp(
            Extension(state),
            Some(Json(VerifyOtpRequest {
                email: "a@x.com".to_string(),
                otp: "12345".to_string(),
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(json["errors"][0]["field"], "otp");
        Ok(())
    }

    #[tokio::test]
    async fn verify_unknown_email_is_404() {
        let (state, _clock) = test_state();
        let response = verify_otp(
            Extension(state),
            Some(Json(VerifyOtpRequest {
                email: "nobody@x.com".to_string(),
                otp: "123456".to_string(),
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
