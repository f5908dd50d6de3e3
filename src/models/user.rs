//! User model - durable accounts created by OTP verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Account role codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "doctor" => Role::Doctor,
            "admin" => Role::Admin,
            _ => Role::Patient,
        }
    }

    /// Post-login landing destination for this role.
    pub fn landing_path(&self) -> &'static str {
        match self {
            Role::Patient => "/dashboard/patient",
            Role::Doctor => "/dashboard/doctor",
            Role::Admin => "/dashboard/admin",
        }
    }
}

/// User entity.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub contact_number: String,
    pub phone: Option<String>,
    pub verified: bool,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::parse(&self.role)
    }

    /// Convert to sanitized response (no password hash).
    pub fn sanitized(&self) -> PublicUser {
        PublicUser::from(self.clone())
    }
}

/// Fields for a user row about to be created from a verified registration.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub contact_number: String,
    pub phone: Option<String>,
}

/// User response for API (without sensitive fields).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicUser {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "user@example.com")]
    pub email: String,
    #[schema(example = "Alice Example")]
    pub name: String,
    #[schema(example = "555-0100")]
    pub contact_number: String,
    pub phone: Option<String>,
    #[schema(example = true)]
    pub verified: bool,
    #[schema(example = "patient")]
    pub role: String,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            contact_number: u.contact_number,
            phone: u.phone,
            verified: u.verified,
            role: u.role,
        }
    }
}
