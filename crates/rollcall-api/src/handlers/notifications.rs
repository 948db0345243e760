//! Notification log handlers

use crate::auth::{AuthenticatedAccount, NotificationView};
use crate::error::{ApiResponse, AppError};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use rollcall_core::NotificationRepository;
use std::sync::Arc;

/// Newest-first page size for the notification log
const NOTIFICATION_PAGE_SIZE: i64 = 50;

/// List the authenticated account's notifications, newest first
///
/// # Responses
///
/// * `200 OK` - Notification entries
/// * `401 Unauthorized` - Missing or invalid token
#[utoipa::path(
    get,
    path = "/api/auth/notifications",
    tag = "auth",
    responses(
        (status = 200, description = "Notification entries"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
) -> Result<impl IntoResponse, AppError> {
    let notifications = state
        .store
        .list_notifications(account.account_id, NOTIFICATION_PAGE_SIZE)
        .await?;

    let views: Vec<NotificationView> = notifications.into_iter().map(Into::into).collect();

    Ok(Json(ApiResponse::ok("Notifications retrieved", views)))
}
