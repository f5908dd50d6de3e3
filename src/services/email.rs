use async_trait::async_trait;
use dashmap::DashMap;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::services::ServiceError;

/// Notification channel for one-time codes.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.app_password.clone());

        let mailer = SmtpTransport::relay(&config.relay)
            .map_err(|e| ServiceError::EmailDispatch(e.to_string()))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(relay = %config.relay, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.user.clone(),
        })
    }
}

#[async_trait]
impl OtpMailer for SmtpMailer {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        expires_in_minutes: i64,
    ) -> Result<(), ServiceError> {
        let html_body = format!(
            r#"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Your verification code</h2>
                    <p>Enter this code to complete your registration:</p>
                    <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold;">{code}</p>
                    <p style="color: #666; font-size: 12px;">
                        This code expires in {expires_in_minutes} minutes. If you didn't request it, please ignore this email.
                    </p>
                </body>
            </html>"#
        );

        let plain_body = format!(
            "Your verification code is {code}.\n\nIt expires in {expires_in_minutes} minutes. \
             If you didn't request it, please ignore this email.",
        );

        let email = Message::builder()
            .from(
                self.from_email
                    .parse()
                    .map_err(|e: lettre::address::AddressError| {
                        ServiceError::Internal(e.into())
                    })?,
            )
            .to(to_email
                .parse()
                .map_err(|e: lettre::address::AddressError| ServiceError::Internal(e.into()))?)
            .subject("Your registration code")
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )
            .map_err(|e| ServiceError::Internal(e.into()))?;

        // Send on the blocking pool to avoid stalling the async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, "OTP email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send OTP email");
                Err(ServiceError::EmailDispatch(e.to_string()))
            }
        }
    }
}

/// Capturing mailer for tests: records the last code dispatched per address
/// and can be flipped into a failing mode.
#[derive(Default)]
pub struct MockMailer {
    sent: DashMap<String, String>,
    fail: AtomicBool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last code dispatched to `email`, if any.
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.sent.get(email).map(|entry| entry.value().clone())
    }

    /// Make subsequent sends fail with an email-dispatch error.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl OtpMailer for MockMailer {
    async fn send_otp(
        &self,
        to_email: &str,
        code: &str,
        _expires_in_minutes: i64,
    ) -> Result<(), ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::EmailDispatch("smtp unavailable".into()));
        }
        self.sent.insert(to_email.to_string(), code.to_string());
        Ok(())
    }
}
