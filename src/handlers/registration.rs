use axum::{extract::State, http::StatusCode, Json};

use crate::{
    dtos::{
        auth::{
            ResendOtpRequest, ResendOtpResponse, SignUpRequest, SignUpResponse, VerifyOtpRequest,
            VerifyOtpResponse,
        },
        ErrorResponse,
    },
    services::ServiceError,
    utils::ValidatedJson,
    AppState,
};

/// Stage a registration and email a one-time code
#[utoipa::path(
    post,
    path = "/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 200, description = "OTP dispatched", body = SignUpResponse),
        (status = 400, description = "Email already registered or registration in progress", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignUpRequest>,
) -> Result<(StatusCode, Json<SignUpResponse>), ServiceError> {
    let res = state.gate.start_signup(req).await?;
    Ok((StatusCode::OK, Json(res)))
}

/// Verify a one-time code and create the durable user
#[utoipa::path(
    post,
    path = "/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 201, description = "User created and credential issued", body = VerifyOtpResponse),
        (status = 400, description = "No pending registration, expired or invalid code", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<VerifyOtpRequest>,
) -> Result<(StatusCode, Json<VerifyOtpResponse>), ServiceError> {
    let res = state.gate.verify(req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

/// Replace the staged code and email a fresh one
#[utoipa::path(
    post,
    path = "/resend-otp",
    request_body = ResendOtpRequest,
    responses(
        (status = 200, description = "New OTP dispatched", body = ResendOtpResponse),
        (status = 400, description = "No pending registration for this email", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Registration"
)]
pub async fn resend_otp(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ResendOtpRequest>,
) -> Result<(StatusCode, Json<ResendOtpResponse>), ServiceError> {
    let res = state.gate.resend(req).await?;
    Ok((StatusCode::OK, Json(res)))
}
