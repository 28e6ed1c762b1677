//! Registration endpoint.

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::error::{self, AuthFlowError, ErrorBody, FieldError};
use super::password;
use super::state::AuthState;
use super::store::{InsertOutcome, NewAccount};
use super::types::{MessageResponse, RegisterRequest};
use super::utils::{normalize_email, valid_email};

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created unverified, OTP emailed", body = MessageResponse),
        (status = 400, description = "Validation failure or duplicate email/username", body = ErrorBody),
        (status = 500, description = "OTP email could not be queued", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn register(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return error::missing_payload(),
    };

    match handle(&state, request).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn handle(
    state: &AuthState,
    request: RegisterRequest,
) -> Result<MessageResponse, AuthFlowError> {
    let email = normalize_email(&request.email);
    validate(&request, &email)?;

    // Hashing is the slow part by design; it runs on the blocking pool.
    let password_hash = password::hash(request.password, state.config().bcrypt_cost())
        .await
        .map_err(|err| {
            error!("Password hashing failed: {err}");
            AuthFlowError::Internal("Registration failed".to_string())
        })?;

    let account = NewAccount {
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        organization_name: request.organization_name.trim().to_string(),
        role: request.role.trim().to_string(),
        email: email.clone(),
        username: request.username.trim().to_string(),
        password_hash,
        created_at: state.clock().now(),
    };

    match state.store().insert_unique(account) {
        InsertOutcome::Inserted(id) => debug!(id, "account created, pending verification"),
        InsertOutcome::Conflict => return Err(AuthFlowError::Conflict),
    }

    state.issue_otp(&email)?;

    Ok(MessageResponse {
        success: true,
        message: "Registration successful. Please check your email for OTP verification."
            .to_string(),
    })
}

fn validate(request: &RegisterRequest, email: &str) -> Result<(), AuthFlowError> {
    let mut errors = Vec::new();

    if request.first_name.trim().is_empty() {
        errors.push(FieldError::new("firstName", "First name is required"));
    }
    if request.last_name.trim().is_empty() {
        errors.push(FieldError::new("lastName", "Last name is required"));
    }
    if request.organization_name.trim().is_empty() {
        errors.push(FieldError::new(
            "organizationName",
            "Organization name is required",
        ));
    }
    if request.role.trim().is_empty() {
        errors.push(FieldError::new("role", "Role is required"));
    }
    if !valid_email(email) {
        errors.push(FieldError::new("email", "Valid email is required"));
    }
    if request.username.trim().len() < 3 {
        errors.push(FieldError::new(
            "username",
            "Username must be at least 3 characters",
        ));
    }
    if request.password.len() < 6 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AuthFlowError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::support::{register_request, test_state};
    use super::register;
    use anyhow::Result;
    use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn register_missing_payload() {
        let (state, _clock) = test_state();
        let response = register(Extension(state), None).await.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_short_username_and_password() -> Result<()> {
        let (state, _clock) = test_state();
        let mut request = register_request("a@x.com", "alice");
        request.username = "al".to_string();
        request.password = "short".to_string();

        let response = register(Extension(state.clone()), Some(Json(request)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(json["message"], "Validation failed");
        assert_eq!(json["errors"].as_array().map(Vec::len), Some(2));

        // Nothing was stored for a rejected request.
        assert!(state.store().is_empty());
        Ok(())
    }
}
