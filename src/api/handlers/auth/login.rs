//! Login endpoint.
//!
//! A successful login does not authenticate by itself: it only means the
//! password matched and a fresh OTP is on its way to the inbox.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::error::{self, AuthFlowError, ErrorBody, FieldError};
use super::password;
use super::state::AuthState;
use super::types::{LoginRequest, MessageResponse};
use super::utils::{normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Password verified, OTP emailed", body = MessageResponse),
        (status = 400, description = "Validation failure", body = ErrorBody),
        (status = 401, description = "Unknown email or wrong password", body = ErrorBody),
        (status = 500, description = "OTP email could not be queued", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error::missing_payload(),
    };

    match handle(&state, request).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle(state: &AuthState, request: LoginRequest) -> Result<MessageResponse, AuthFlowError> {
    let email = normalize_email(&request.email);
    validate(&request, &email)?;

    // Unknown email and wrong password answer identically so addresses
    // cannot be probed.
    let Some(account) = state.store().find_by_email(&email) else {
        return Err(AuthFlowError::InvalidCredentials);
    };

    if !password::verify(request.password, account.password_hash).await {
        return Err(AuthFlowError::InvalidCredentials);
    }

    debug!("password verified, issuing OTP");
    state.issue_otp(&email)?;

    Ok(MessageResponse {
        success: true,
        message: "Login successful. Please check your email for OTP verification.".to_string(),
    })
}

fn validate(request: &LoginRequest, email: &str) -> Result<(), AuthFlowError> {
    let mut errors = Vec::new();

    if !valid_email(email) {
        errors.push(FieldError::new("email", "Valid email is required"));
    }
    if request.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthFlowError::Validation(errors))
    }
}
