//! Pending registration model - staged signup data awaiting OTP verification.

use chrono::{DateTime, Utc};

use crate::models::NewUser;

/// Registration data staged under an email until the one-time code is
/// verified. The plaintext code is never stored, only its SHA-256 hash.
#[derive(Debug, Clone)]
pub struct PendingRegistration {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub contact_number: String,
    pub phone: Option<String>,
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
}

impl PendingRegistration {
    pub fn new(
        email: String,
        password_hash: String,
        name: String,
        contact_number: String,
        phone: Option<String>,
        code_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            email,
            password_hash,
            name,
            contact_number,
            phone,
            code_hash,
            expires_at,
            attempts: 0,
            created_at: Utc::now(),
        }
    }

    /// A code is accepted up to and including the expiry instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// The staged fields, ready to be promoted into a durable user row.
    pub fn to_new_user(&self) -> NewUser {
        NewUser {
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            name: self.name.clone(),
            contact_number: self.contact_number.clone(),
            phone: self.phone.clone(),
        }
    }
}

/// Per-email registration lifecycle. `Verified` is terminal and represented by
/// the durable user row; `Pending` is backed by a live staging entry.
#[derive(Debug, Clone)]
pub enum RegistrationState {
    None,
    Pending(PendingRegistration),
    Verified,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn staged(expires_at: DateTime<Utc>) -> PendingRegistration {
        PendingRegistration::new(
            "a@x.com".into(),
            "$argon2id$stub".into(),
            "Alice".into(),
            "555-0100".into(),
            None,
            "deadbeef".into(),
            expires_at,
        )
    }

    #[test]
    fn accepted_at_expiry_instant() {
        let now = Utc::now();
        let rec = staged(now);
        assert!(!rec.is_expired_at(now));
    }

    #[test]
    fn expired_strictly_after_expiry() {
        let now = Utc::now();
        let rec = staged(now - Duration::milliseconds(1));
        assert!(rec.is_expired_at(now));
    }
}
