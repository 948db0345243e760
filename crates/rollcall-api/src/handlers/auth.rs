//! Authentication API handlers
//!
//! HTTP endpoints for registration, login, password reset, and unlock.
//! Handlers translate between the JSON envelope and the auth service;
//! policy lives in the service, not here.

use crate::auth::{
    AuthenticatedAccount, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest,
    SignupRequest, UnlockAccountRequest,
};
use crate::error::{ApiResponse, AppError};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;

/// Fixed response for forgot-password, identical for registered and unknown
/// emails, backup-email mismatches, and delivery failures.
const FORGOT_PASSWORD_MESSAGE: &str =
    "If that account exists, a password reset link has been sent.";

/// Register a new account
///
/// # Responses
///
/// * `201 Created` - Account created
/// * `400 Bad Request` - Missing email or weak password
/// * `409 Conflict` - Email already registered
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Missing email or weak password"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let account = state.auth.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("Account created", account)),
    ))
}

/// Login with email and password
///
/// Failed attempts are tracked per account; the third consecutive failure
/// locks the account for a short window and further attempts answer 423
/// with the seconds remaining.
///
/// # Responses
///
/// * `200 OK` - Returns the access token
/// * `400 Bad Request` - Missing email or password
/// * `401 Unauthorized` - Invalid credentials
/// * `423 Locked` - Account temporarily locked
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 423, description = "Account temporarily locked"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let data = state.auth.login(request).await?;

    Ok(Json(ApiResponse::ok("Login successful", data)))
}

/// Request a password-reset link
///
/// Always answers with the same generic message so the response does not
/// reveal whether an email is registered.
///
/// # Responses
///
/// * `200 OK` - Generic acknowledgement
/// * `400 Bad Request` - Missing email
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Generic acknowledgement"),
        (status = 400, description = "Missing email"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.forgot_password(request).await?;

    Ok(Json(ApiResponse::message(FORGOT_PASSWORD_MESSAGE)))
}

/// Reset the password with a token from the reset link
///
/// # Responses
///
/// * `200 OK` - Password updated
/// * `400 Bad Request` - Missing fields, weak password, or invalid/expired token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 400, description = "Missing fields, weak password, or invalid token"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.reset_password(request).await?;

    Ok(Json(ApiResponse::message("Password has been reset.")))
}

/// Clear a lockout for an account
///
/// Idempotent; unknown emails are acknowledged the same way as known ones.
///
/// # Responses
///
/// * `200 OK` - Lockout cleared (or nothing to clear)
/// * `400 Bad Request` - Missing email
#[utoipa::path(
    post,
    path = "/api/auth/unlock-account",
    tag = "auth",
    request_body = UnlockAccountRequest,
    responses(
        (status = 200, description = "Lockout cleared"),
        (status = 400, description = "Missing email"),
        (status = 500, description = "Internal server error"),
    )
)]
pub async fn unlock_account_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UnlockAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.unlock_account(request).await?;

    Ok(Json(ApiResponse::message("Account unlocked.")))
}

/// Get the authenticated account's profile
///
/// # Responses
///
/// * `200 OK` - Profile data
/// * `401 Unauthorized` - Missing or invalid token
/// * `404 Not Found` - Account behind the token no longer exists
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Profile data"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Account not found"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
) -> Result<impl IntoResponse, AppError> {
    let info = state.auth.profile(account.account_id).await?;

    Ok(Json(ApiResponse::ok("Profile retrieved", info)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forgot_password_message_is_generic() {
        // One fixed string for every outcome; it must not assert existence
        assert!(FORGOT_PASSWORD_MESSAGE.starts_with("If that account exists"));
    }
}
