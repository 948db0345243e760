/// Authentication middleware for protecting routes
///
/// Extracts and validates the bearer token from the Authorization header.
/// On success, adds the authenticated account to request extensions.
use super::jwt::{validate_access_token, Claims, JwtError};
use crate::error::ApiResponse;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

/// Authenticated account information extracted from the access token.
///
/// Added to request extensions by [`auth_middleware`]; handlers extract it
/// with `Extension<AuthenticatedAccount>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account_id: Uuid,
    pub email: String,
    pub jti: String,
}

impl TryFrom<Claims> for AuthenticatedAccount {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let account_id = Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)?;

        Ok(Self {
            account_id,
            email: claims.email,
            jti: claims.jti,
        })
    }
}

/// Authentication middleware errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] JwtError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingAuthHeader => "Missing Authorization header",
            AuthError::InvalidAuthHeader => "Invalid Authorization header format",
            AuthError::InvalidToken(_) => "Invalid or expired token",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error(message)),
        )
            .into_response()
    }
}

/// Middleware that requires a valid bearer token.
///
/// The signing secret comes from application state, so tests can run the
/// stack with an alternate secret.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;

    let claims = validate_access_token(&state.jwt, token).map_err(|e| {
        warn!(target: "audit", reason = %e, "rejected access token");
        AuthError::InvalidToken(e)
    })?;

    let account = AuthenticatedAccount::try_from(claims)?;
    request.extensions_mut().insert(account);

    Ok(next.run(request).await)
}
