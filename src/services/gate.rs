//! Registration gate - the OTP-verified signup state machine.
//!
//! Per email the lifecycle is NONE -> PENDING -> VERIFIED, where VERIFIED is
//! terminal and represented by the durable user row. PENDING is held in the
//! staging store and falls back to NONE on expiry. The staging store's
//! compare-and-set insert arbitrates overlapping signups; the user store's
//! unique email constraint arbitrates the final promotion.

use chrono::{Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::dtos::auth::{
    ResendOtpRequest, ResendOtpResponse, SignUpRequest, SignUpResponse, VerifyOtpRequest,
    VerifyOtpResponse,
};
use crate::models::{PendingRegistration, RegistrationState};
use crate::services::{JwtService, OtpMailer, ServiceError, StagingInsert, StagingStore, UserStore};
use crate::utils::{hash_password, Password};

const OTP_LENGTH: u32 = 6;

#[derive(Clone)]
pub struct RegistrationGate {
    users: Arc<dyn UserStore>,
    staging: Arc<dyn StagingStore>,
    mailer: Arc<dyn OtpMailer>,
    jwt: JwtService,
    otp_ttl: Duration,
    max_attempts: u32,
}

impl RegistrationGate {
    pub fn new(
        users: Arc<dyn UserStore>,
        staging: Arc<dyn StagingStore>,
        mailer: Arc<dyn OtpMailer>,
        jwt: JwtService,
        otp_ttl: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            users,
            staging,
            mailer,
            jwt,
            otp_ttl,
            max_attempts,
        }
    }

    fn expires_in_minutes(&self) -> i64 {
        self.otp_ttl.num_minutes()
    }

    /// Current lifecycle state for an email. Read-only: expired staging
    /// entries report as `None` but are reclaimed lazily by the writers.
    pub async fn state_of(&self, email: &str) -> Result<RegistrationState, ServiceError> {
        if self.users.find_by_email(email).await?.is_some() {
            return Ok(RegistrationState::Verified);
        }

        match self.staging.get(email).await? {
            Some(rec) if !rec.is_expired() => Ok(RegistrationState::Pending(rec)),
            _ => Ok(RegistrationState::None),
        }
    }

    /// Stage a registration and dispatch a one-time code.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn start_signup(&self, req: SignUpRequest) -> Result<SignUpResponse, ServiceError> {
        match self.state_of(&req.email).await? {
            RegistrationState::Verified => return Err(ServiceError::DuplicateUser),
            RegistrationState::Pending(_) => return Err(ServiceError::RegistrationInProgress),
            RegistrationState::None => {}
        }

        let password_hash = hash_password(&Password::new(req.password))
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Password hashing error: {e}")))?;

        let code = generate_code();
        let record = PendingRegistration::new(
            req.email.clone(),
            password_hash.into_string(),
            req.name,
            req.contact_number,
            req.phone,
            hash_code(&code),
            Utc::now() + self.otp_ttl,
        );

        // CAS insert: a concurrent signup that slipped past state_of loses
        // here instead of silently overwriting the winner's code.
        if self.staging.insert_if_vacant(record).await? == StagingInsert::Occupied {
            return Err(ServiceError::RegistrationInProgress);
        }

        // Stage-then-send: a failed dispatch removes the entry so the email
        // never stays locked behind a code nobody received.
        if let Err(e) = self
            .mailer
            .send_otp(&req.email, &code, self.expires_in_minutes())
            .await
        {
            self.staging.remove(&req.email).await?;
            return Err(e);
        }

        tracing::info!(email = %req.email, "Registration staged, OTP dispatched");

        Ok(SignUpResponse {
            success: true,
            message: "OTP sent. Check your email to complete registration.".to_string(),
            email: req.email,
            expires_in: self.expires_in_minutes(),
        })
    }

    /// Verify a submitted code and promote the staged data into a durable
    /// user. Success consumes the pending entry; replay is impossible.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn verify(&self, req: VerifyOtpRequest) -> Result<VerifyOtpResponse, ServiceError> {
        let record = self
            .staging
            .get(&req.email)
            .await?
            .ok_or(ServiceError::NoPendingRegistration)?;

        if record.is_expired() {
            self.staging.remove(&req.email).await?;
            return Err(ServiceError::CodeExpired);
        }

        if hash_code(&req.otp) != record.code_hash {
            return match self.staging.record_attempt(&req.email).await? {
                Some(attempts) if attempts >= self.max_attempts => {
                    self.staging.remove(&req.email).await?;
                    tracing::warn!(email = %req.email, attempts, "Pending registration locked out");
                    Err(ServiceError::TooManyAttempts)
                }
                _ => Err(ServiceError::InvalidCode),
            };
        }

        let user = match self.users.create_verified(record.to_new_user()).await {
            Ok(user) => user,
            Err(ServiceError::DuplicateUser) => {
                // Lost the uniqueness race to a concurrent registration.
                self.staging.remove(&req.email).await?;
                return Err(ServiceError::DuplicateUser);
            }
            Err(e) => return Err(e),
        };

        self.staging.remove(&req.email).await?;

        let token = self.jwt.issue(user.id, &user.email)?;

        tracing::info!(user_id = user.id, "Registration verified, user created");

        Ok(VerifyOtpResponse {
            success: true,
            token,
            redirect_to: user.role().landing_path().to_string(),
            user: user.sanitized(),
        })
    }

    /// Replace the staged code with a fresh one and redispatch it. The
    /// expiry window restarts from now.
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn resend(&self, req: ResendOtpRequest) -> Result<ResendOtpResponse, ServiceError> {
        let record = self
            .staging
            .get(&req.email)
            .await?
            .ok_or(ServiceError::NoPendingRegistration)?;

        if record.is_expired() {
            self.staging.remove(&req.email).await?;
            return Err(ServiceError::NoPendingRegistration);
        }

        let code = generate_code();
        let replaced = self
            .staging
            .replace_code(&req.email, hash_code(&code), Utc::now() + self.otp_ttl)
            .await?;
        if !replaced {
            return Err(ServiceError::NoPendingRegistration);
        }

        // On dispatch failure the entry is kept: the user may still hold the
        // previous email, and the entry expires on its own.
        self.mailer
            .send_otp(&req.email, &code, self.expires_in_minutes())
            .await?;

        tracing::info!(email = %req.email, "OTP re-dispatched");

        Ok(ResendOtpResponse {
            success: true,
            message: "A new OTP has been sent to your email.".to_string(),
            expires_in: self.expires_in_minutes(),
        })
    }
}

/// Generate a fixed-length numeric code.
fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..OTP_LENGTH)
        .map(|_| rng.gen_range(0..10).to_string())
        .collect()
}

/// Hash a code for storage; plaintext codes never sit in the staging store.
fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}
