use serde::Deserialize;
use std::env;

use crate::services::ServiceError;

#[derive(Debug, Clone, Deserialize)]
pub struct RegistrationConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub jwt: JwtConfig,
    pub otp: OtpConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub user: String,
    pub app_password: String,
    pub relay: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub token_expiry_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OtpConfig {
    /// Lifetime of a dispatched code. The reference window is 3 minutes.
    pub ttl_seconds: i64,
    /// Invalid verify attempts allowed before the pending entry is dropped.
    pub max_attempts: u32,
    /// Cadence of the background sweep of expired staging entries.
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub signup_attempts: u32,
    pub signup_window_seconds: u64,
    pub resend_attempts: u32,
    pub resend_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl RegistrationConfig {
    pub fn from_env() -> Result<Self, ServiceError> {
        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| ServiceError::Config(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = RegistrationConfig {
            environment,
            service_name: get_env("SERVICE_NAME", Some("registration-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            port: parse_env("PORT", Some("8080"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?,
            },
            smtp: SmtpConfig {
                user: get_env("SMTP_USER", None, is_prod)?,
                app_password: get_env("SMTP_APP_PASSWORD", None, is_prod)?,
                relay: get_env("SMTP_RELAY", Some("smtp.gmail.com"), is_prod)?,
                port: parse_env("SMTP_PORT", Some("587"), is_prod)?,
            },
            jwt: JwtConfig {
                secret: get_env("JWT_SECRET", None, is_prod)?,
                token_expiry_minutes: parse_env("JWT_TOKEN_EXPIRY_MINUTES", Some("60"), is_prod)?,
            },
            otp: OtpConfig {
                ttl_seconds: parse_env("OTP_TTL_SECONDS", Some("180"), is_prod)?,
                max_attempts: parse_env("OTP_MAX_ATTEMPTS", Some("5"), is_prod)?,
                sweep_interval_seconds: parse_env("OTP_SWEEP_INTERVAL_SECONDS", Some("60"), is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            rate_limit: RateLimitConfig {
                signup_attempts: parse_env("RATE_LIMIT_SIGNUP_ATTEMPTS", Some("3"), is_prod)?,
                signup_window_seconds: parse_env(
                    "RATE_LIMIT_SIGNUP_WINDOW_SECONDS",
                    Some("3600"),
                    is_prod,
                )?,
                resend_attempts: parse_env("RATE_LIMIT_RESEND_ATTEMPTS", Some("5"), is_prod)?,
                resend_window_seconds: parse_env(
                    "RATE_LIMIT_RESEND_WINDOW_SECONDS",
                    Some("900"),
                    is_prod,
                )?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("100"), is_prod)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.port == 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.otp.ttl_seconds <= 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "OTP_TTL_SECONDS must be positive"
            )));
        }

        if self.otp.max_attempts == 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "OTP_MAX_ATTEMPTS must be at least 1"
            )));
        }

        if self.jwt.token_expiry_minutes <= 0 {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "JWT_TOKEN_EXPIRY_MINUTES must be positive"
            )));
        }

        if self.environment == Environment::Prod
            && self.security.allowed_origins.iter().any(|o| o == "*")
        {
            return Err(ServiceError::Config(anyhow::anyhow!(
                "Wildcard CORS origin not allowed in production"
            )));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, ServiceError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(ServiceError::Config(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(ServiceError::Config(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, ServiceError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e| {
        ServiceError::Config(anyhow::anyhow!(format!("Invalid value for {}: {}", key, e)))
    })
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
