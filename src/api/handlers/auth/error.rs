//! Error taxonomy for the auth flow.
//!
//! Deliberate failures carry a specific status and message; anything
//! unexpected is collapsed to a generic 500 at the handler boundary so
//! internals never leak. Every error answers with the same envelope:
//! `{"success": false, "message": ..., "errors": [...]}` where `errors` is
//! present only for validation failures.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// One violated input constraint, reported under `errors` in a 400 response.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthFlowError {
    /// Input did not meet the endpoint's constraints; lists every violation.
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    /// Email or username already taken.
    #[error("User with this email or username already exists")]
    Conflict,
    /// Unknown email or wrong password; intentionally non-specific.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// No account for the email presented at verification time.
    #[error("User not found")]
    AccountNotFound,
    /// No pending code: never requested, already consumed, or restarted.
    #[error("OTP not found or expired")]
    OtpMissing,
    /// Submitted code does not match the pending one.
    #[error("Invalid OTP")]
    OtpMismatch,
    /// Pending code past its deadline; the entry has been consumed.
    #[error("OTP has expired")]
    OtpExpired,
    /// The OTP email could not be handed to the outbox.
    #[error("Failed to send OTP email")]
    EmailDispatch,
    /// Unexpected fault, reported with an operation-generic message.
    #[error("{0}")]
    Internal(String),
}

impl AuthFlowError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Conflict
            | Self::OtpMissing
            | Self::OtpMismatch
            | Self::OtpExpired => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AccountNotFound => StatusCode::NOT_FOUND,
            Self::EmailDispatch | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope shared by every failing response.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

/// 400 response for an absent or undecodable JSON body, in the same
/// envelope as every other error.
pub(super) fn missing_payload() -> Response {
    let body = ErrorBody {
        success: false,
        message: "Missing payload".to_string(),
        errors: None,
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

impl IntoResponse for AuthFlowError {
    fn into_response(self) -> Response {
        let errors = match &self {
            Self::Validation(errors) => Some(errors.clone()),
            _ => None,
        };
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            errors,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(
            AuthFlowError::Validation(Vec::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AuthFlowError::Conflict.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthFlowError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthFlowError::AccountNotFound.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AuthFlowError::OtpMissing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthFlowError::OtpMismatch.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AuthFlowError::OtpExpired.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AuthFlowError::EmailDispatch.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthFlowError::Internal("Login failed".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn validation_body_lists_violations() -> Result<()> {
        let error = AuthFlowError::Validation(vec![
            FieldError::new("email", "Valid email is required"),
            FieldError::new("password", "Password must be at least 6 characters"),
        ]);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Validation failed");
        assert_eq!(
            json["errors"].as_array().map(Vec::len),
            Some(2)
        );
        Ok(())
    }

    #[tokio::test]
    async fn non_validation_body_omits_errors() -> Result<()> {
        let response = AuthFlowError::InvalidCredentials.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let json: serde_json::Value = serde_json::from_slice(&bytes)?;
        assert_eq!(json["message"], "Invalid credentials");
        assert!(json.get("errors").is_none());
        Ok(())
    }
}
