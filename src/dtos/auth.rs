use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::PublicUser;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SignUpRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[schema(example = "password123", min_length = 8)]
    pub password: String,

    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Alice Example")]
    pub name: String,

    #[validate(length(min = 1, message = "Contact number is required"))]
    #[schema(example = "555-0100")]
    pub contact_number: String,

    #[schema(example = "555-0199")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignUpResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "OTP sent. Check your email to complete registration.")]
    pub message: String,
    #[schema(example = "user@example.com")]
    pub email: String,
    /// Minutes until the dispatched code expires.
    #[serde(rename = "expiresIn")]
    #[schema(example = 3)]
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,

    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    #[schema(example = "123456")]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpResponse {
    #[schema(example = true)]
    pub success: bool,
    /// Signed bearer credential for the freshly created account.
    pub token: String,
    pub user: PublicUser,
    /// Role-based landing destination.
    #[serde(rename = "redirectTo")]
    #[schema(example = "/dashboard/patient")]
    pub redirect_to: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResendOtpRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "user@example.com")]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResendOtpResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "A new OTP has been sent to your email.")]
    pub message: String,
    #[serde(rename = "expiresIn")]
    #[schema(example = 3)]
    pub expires_in: i64,
}
