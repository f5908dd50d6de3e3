//! Test harness for registration-service integration tests.
//!
//! Builds the real router over in-memory stores and a capturing mailer, then
//! drives it request-by-request through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use registration_service::{
    build_router,
    config::{
        DatabaseConfig, Environment, JwtConfig, OtpConfig, RateLimitConfig, RegistrationConfig,
        SecurityConfig, SmtpConfig,
    },
    middleware::create_ip_rate_limiter,
    services::{InMemoryStaging, InMemoryUserStore, JwtService, MockMailer, RegistrationGate},
    AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

pub struct TestApp {
    pub router: Router,
    pub mailer: Arc<MockMailer>,
    pub users: Arc<InMemoryUserStore>,
    pub staging: Arc<InMemoryStaging>,
}

impl TestApp {
    /// App with the reference 3-minute OTP window.
    pub fn spawn() -> Self {
        Self::with_otp(chrono::Duration::minutes(3), 5)
    }

    /// App with a custom OTP window and attempt cap, for expiry tests.
    pub fn with_otp(ttl: chrono::Duration, max_attempts: u32) -> Self {
        let config = test_config();

        let users = Arc::new(InMemoryUserStore::new());
        let staging = Arc::new(InMemoryStaging::new());
        let mailer = Arc::new(MockMailer::new());
        let jwt = JwtService::new(&config.jwt).expect("Failed to create JWT service");

        let gate = RegistrationGate::new(
            users.clone(),
            staging.clone(),
            mailer.clone(),
            jwt,
            ttl,
            max_attempts,
        );

        let state = AppState {
            config,
            gate,
            pool: None,
            signup_rate_limiter: create_ip_rate_limiter(1000, 60),
            resend_rate_limiter: create_ip_rate_limiter(1000, 60),
            ip_rate_limiter: create_ip_rate_limiter(10_000, 60),
        };

        TestApp {
            router: build_router(state),
            mailer,
            users,
            staging,
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn sign_up(&self, email: &str) -> (StatusCode, Value) {
        self.post(
            "/sign-up",
            json!({
                "email": email,
                "password": "secret-password-1",
                "name": "Alice",
                "contact_number": "555-0100",
            }),
        )
        .await
    }

    pub async fn verify(&self, email: &str, otp: &str) -> (StatusCode, Value) {
        self.post("/verify-otp", json!({ "email": email, "otp": otp }))
            .await
    }

    pub async fn resend(&self, email: &str) -> (StatusCode, Value) {
        self.post("/resend-otp", json!({ "email": email })).await
    }

    /// Code the mailer last dispatched to `email`. Panics if none was sent.
    pub fn dispatched_code(&self, email: &str) -> String {
        self.mailer
            .last_code(email)
            .expect("no OTP was dispatched to this address")
    }
}

fn test_config() -> RegistrationConfig {
    RegistrationConfig {
        environment: Environment::Dev,
        service_name: "registration-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "debug".to_string(),
        port: 0,
        database: DatabaseConfig {
            url: "postgres://localhost/registration_test".to_string(),
            max_connections: 5,
            min_connections: 1,
        },
        smtp: SmtpConfig {
            user: "test@example.com".to_string(),
            app_password: "test-password".to_string(),
            relay: "smtp.example.com".to_string(),
            port: 587,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            token_expiry_minutes: 60,
        },
        otp: OtpConfig {
            ttl_seconds: 180,
            max_attempts: 5,
            sweep_interval_seconds: 60,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            signup_attempts: 1000,
            signup_window_seconds: 60,
            resend_attempts: 1000,
            resend_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}
