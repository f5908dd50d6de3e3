use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::dtos::ErrorResponse;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Email already registered")]
    DuplicateUser,

    #[error("Registration already in progress. Check your email for the code or wait for it to expire.")]
    RegistrationInProgress,

    #[error("No pending registration for this email")]
    NoPendingRegistration,

    #[error("OTP expired")]
    CodeExpired,

    #[error("Invalid OTP")]
    InvalidCode,

    #[error("Too many invalid attempts")]
    TooManyAttempts,

    #[error("Email error: {0}")]
    EmailDispatch(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Client-recoverable gate errors surface as 400 with their message;
    /// infrastructure failures surface as 500 with no detail exposed.
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::DuplicateUser
            | ServiceError::RegistrationInProgress
            | ServiceError::NoPendingRegistration
            | ServiceError::CodeExpired
            | ServiceError::InvalidCode
            | ServiceError::TooManyAttempts => StatusCode::BAD_REQUEST,
            ServiceError::TooManyRequests(..) => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::EmailDispatch(_)
            | ServiceError::Database(_)
            | ServiceError::Config(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let retry_after = match &self {
            ServiceError::TooManyRequests(_, retry) => *retry,
            _ => None,
        };

        let mut res = (status, Json(ErrorResponse::new(error))).into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}
