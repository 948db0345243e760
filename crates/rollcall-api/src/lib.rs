//! Rollcall API - REST server for authentication and account lockout
//!
//! Provides the HTTP surface for registration, login, password reset, and
//! manual unlock, plus the notification log and operational endpoints.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::signup_handler,
        handlers::auth::login_handler,
        handlers::auth::forgot_password_handler,
        handlers::auth::reset_password_handler,
        handlers::auth::unlock_account_handler,
        handlers::auth::me_handler,
        handlers::notifications::list_notifications_handler,
        handlers::health::health_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        auth::SignupRequest,
        auth::LoginRequest,
        auth::ForgotPasswordRequest,
        auth::ResetPasswordRequest,
        auth::UnlockAccountRequest,
        auth::LoginData,
        auth::AccountInfo,
        auth::NotificationView,
    )),
    tags(
        (name = "auth", description = "Authentication and account lockout"),
        (name = "health", description = "Service health and readiness"),
    )
)]
pub struct ApiDoc;

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .nest("/api/auth", routes::api_routes(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from the configured origins.
///
/// With no configured origins cross-origin requests stay disallowed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

    if parsed.is_empty() {
        CorsLayer::new()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Router wired to a lazily connected pool; endpoints that never touch the
/// database work without one running.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    use rollcall_core::{AppConfig, PgStore};
    use sqlx::postgres::PgPoolOptions;

    let config = AppConfig::default();
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database.url)
        .expect("lazy pool construction cannot fail");
    let store = PgStore::from_pool(pool);
    let state = Arc::new(AppState::new(
        config,
        store,
        Arc::new(mailer::NoopMailer),
    ));

    create_router(state)
}
