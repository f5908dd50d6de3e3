pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;
pub mod utils;

use axum::{
    http::{HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Environment, RegistrationConfig};
use crate::middleware::{ip_rate_limit_middleware, IpRateLimiter};
use crate::services::{RegistrationGate, ServiceError};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::registration::sign_up,
        handlers::registration::verify_otp,
        handlers::registration::resend_otp,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::SignUpRequest,
            dtos::auth::SignUpResponse,
            dtos::auth::VerifyOtpRequest,
            dtos::auth::VerifyOtpResponse,
            dtos::auth::ResendOtpRequest,
            dtos::auth::ResendOtpResponse,
            models::PublicUser,
        )
    ),
    tags(
        (name = "Registration", description = "OTP-gated user registration"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: RegistrationConfig,
    pub gate: RegistrationGate,
    /// Present when the durable store is PostgreSQL-backed; drives the
    /// health check. Absent with the in-memory store.
    pub pool: Option<PgPool>,
    pub signup_rate_limiter: IpRateLimiter,
    pub resend_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub fn build_router(state: AppState) -> Router {
    // Sign-up and resend both trigger outbound email, so each carries its
    // own stricter IP limit on top of the global one.
    let signup_limiter = state.signup_rate_limiter.clone();
    let signup_route = Router::new()
        .route("/sign-up", post(handlers::sign_up))
        .layer(from_fn_with_state(signup_limiter, ip_rate_limit_middleware));

    let resend_limiter = state.resend_rate_limiter.clone();
    let resend_route = Router::new()
        .route("/resend-otp", post(handlers::resend_otp))
        .layer(from_fn_with_state(resend_limiter, ip_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let mut app = Router::new().route("/health", get(health_check));

    if state.config.environment == Environment::Dev {
        app = app.merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    app.route("/verify-otp", post(handlers::verify_otp))
        .merge(signup_route)
        .merge(resend_route)
        .with_state(state.clone())
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!("Invalid CORS origin '{}': {}", o, e);
                                HeaderValue::from_static("http://localhost:3000")
                            })
                        })
                        .collect::<Vec<HeaderValue>>(),
                )
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        )
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let database = match &state.pool {
        Some(pool) => {
            db::health_check(pool).await.map_err(|e| {
                tracing::error!(error = %e, "PostgreSQL health check failed");
                ServiceError::Database(e)
            })?;
            "up"
        }
        None => "in-memory",
    };

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "database": database
        }
    })))
}
