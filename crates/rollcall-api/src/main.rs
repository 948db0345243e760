//! Rollcall API Server
//!
//! REST backend for the rollcall attendance product's authentication and
//! account-lockout subsystem.

use rollcall_api::{create_router, mailer, state::AppState};
use rollcall_core::{AppConfig, PgStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rollcall_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration: explicit file when ROLLCALL_CONFIG is set,
    // environment variables otherwise
    let config = match std::env::var("ROLLCALL_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?,
        Err(_) => AppConfig::from_env()?,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Connect to the credential store
    let store = PgStore::connect(&config.database.url, config.database.pool_size).await?;

    // Outbound email (no-op when SMTP is unconfigured)
    let mailer = mailer::build_mailer(&config.email);

    // Create application state and router
    let state = Arc::new(AppState::new(config, store, mailer));
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("rollcall API server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
