use registration_service::{
    build_router,
    config::RegistrationConfig,
    db,
    middleware::create_ip_rate_limiter,
    observability::init_tracing,
    services::{InMemoryStaging, JwtService, PgUserStore, RegistrationGate, ServiceError, SmtpMailer},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    dotenvy::dotenv().ok();

    // Load configuration - fail fast if invalid
    let config = RegistrationConfig::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting registration service"
    );

    // Durable user store
    let pool = db::create_pool(&config.database)
        .await
        .map_err(ServiceError::Database)?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| ServiceError::Internal(e.into()))?;
    let users = Arc::new(PgUserStore::new(pool.clone()));

    // Staging store with background cleanup of abandoned registrations
    let staging = Arc::new(InMemoryStaging::new());
    InMemoryStaging::spawn_sweeper(
        staging.clone(),
        Duration::from_secs(config.otp.sweep_interval_seconds),
    );
    tracing::info!("Staging store initialized");

    let mailer = Arc::new(SmtpMailer::new(&config.smtp)?);
    let jwt = JwtService::new(&config.jwt)?;

    let gate = RegistrationGate::new(
        users,
        staging,
        mailer,
        jwt,
        chrono::Duration::seconds(config.otp.ttl_seconds),
        config.otp.max_attempts,
    );

    let signup_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.signup_attempts,
        config.rate_limit.signup_window_seconds,
    );
    let resend_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.resend_attempts,
        config.rate_limit.resend_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    let state = AppState {
        config: config.clone(),
        gate,
        pool: Some(pool),
        signup_rate_limiter,
        resend_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::Internal(e.into()))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ServiceError::Internal(e.into()))?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
