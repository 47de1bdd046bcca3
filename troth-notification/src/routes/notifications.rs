use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use troth_shared::errors::AppResult;
use troth_shared::types::api::{Ack, ApiResponse};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::Notification;
use crate::services::notification_service;
use crate::AppState;

#[derive(Debug, serde::Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

#[derive(Debug, serde::Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// GET /notifications
/// List notifications for the authenticated user, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Notification>>>> {
    let (items, total) = notification_service::list_notifications(
        &state.db,
        auth_user.id,
        params.limit() as i64,
        params.offset() as i64,
    )?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

/// GET /notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let count = notification_service::count_unread(&state.db, auth_user.id)?;

    Ok(Json(ApiResponse::ok(UnreadCountResponse { count })))
}

/// POST /notifications/mark-all-read
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
) -> AppResult<Json<ApiResponse<MarkAllReadResponse>>> {
    let updated = notification_service::mark_all_read(&state.db, auth_user.id)?;

    Ok(Json(ApiResponse::ok(MarkAllReadResponse { updated })))
}

/// POST /notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = notification_service::mark_read(&state.db, id, auth_user.id)?;

    Ok(Json(ApiResponse::ok(notification)))
}

/// DELETE /notifications/:id
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    auth_user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    notification_service::delete_notification(&state.db, id, auth_user.id)?;

    Ok(Json(ApiResponse::ok(Ack::done())))
}
