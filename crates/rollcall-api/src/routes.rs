//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, notifications};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create the `/api/auth` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/signup", post(auth::signup_handler))
        .route("/login", post(auth::login_handler))
        .route("/forgot-password", post(auth::forgot_password_handler))
        .route("/reset-password", post(auth::reset_password_handler))
        .route("/unlock-account", post(auth::unlock_account_handler));

    // Protected routes (bearer token required)
    let protected_routes = Router::new()
        .route("/me", get(auth::me_handler))
        .route(
            "/notifications",
            get(notifications::list_notifications_handler),
        )
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
