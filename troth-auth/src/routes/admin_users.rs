use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::middleware::AdminUser;
use troth_shared::types::account::AccountStatus;
use troth_shared::types::auth::UserRole;
use troth_shared::types::api::ApiResponse;
use troth_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::User;
use crate::routes::me::AccountResponse;
use crate::schema::users;
use crate::services::account_service;
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize)]
pub struct UserFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<AccountStatus>,
    pub role: Option<UserRole>,
    /// Case-insensitive email substring
    pub q: Option<String>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl UserFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: AccountStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: UserRole,
}

fn filtered<'a>(params: &'a UserFilterParams) -> users::BoxedQuery<'a, diesel::pg::Pg> {
    let mut query = users::table.into_boxed();
    if let Some(status) = params.status {
        query = query.filter(users::account_status.eq(status.as_str()));
    }
    if let Some(role) = params.role {
        query = query.filter(users::role.eq(role.to_string()));
    }
    if let Some(q) = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        query = query.filter(users::email.ilike(format!("%{q}%")));
    }
    query
}

// --- List users ---

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<UserFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<AccountResponse>>>> {
    let mut conn = get_conn(&state.db)?;
    let pagination = params.pagination();

    let items = filtered(&params)
        .order(users::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<User>(&mut conn)?;
    let total: i64 = filtered(&params).count().get_result(&mut conn)?;

    let items = items.into_iter().map(AccountResponse::from).collect();
    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

// --- Get user ---

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let mut conn = get_conn(&state.db)?;
    let user = account_service::find_user(&mut conn, user_id)?;
    Ok(Json(ApiResponse::ok(user.into())))
}

// --- Set account status ---

pub async fn set_status(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetStatusRequest>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    if user_id == admin.id && body.status.is_banned() {
        return Err(AppError::new(ErrorCode::Forbidden, "cannot ban your own account"));
    }

    let mut conn = get_conn(&state.db)?;
    let user = if body.status.is_banned() {
        account_service::apply_ban(&mut conn, user_id, None)?
    } else {
        account_service::set_status(&mut conn, user_id, body.status)?
    };

    publisher::publish_status_changed(&state.rabbitmq, &user).await;
    tracing::info!(admin_id = %admin.id, user_id = %user_id, status = %body.status, "admin set account status");

    Ok(Json(ApiResponse::ok(user.into())))
}

// --- Set role ---

pub async fn set_role(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(body): Json<SetRoleRequest>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    if user_id == admin.id && body.role != UserRole::Admin {
        return Err(AppError::new(ErrorCode::Forbidden, "cannot demote your own account"));
    }

    let mut conn = get_conn(&state.db)?;
    let user = diesel::update(users::table.find(user_id))
        .set((users::role.eq(body.role.to_string()), users::updated_at.eq(Utc::now())))
        .get_result::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

    tracing::info!(admin_id = %admin.id, user_id = %user_id, role = %body.role, "admin set role");

    Ok(Json(ApiResponse::ok(user.into())))
}

// --- Recalculate trust score ---

pub async fn recalculate_trust_score(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let mut conn = get_conn(&state.db)?;
    let before = account_service::find_user(&mut conn, user_id)?.trust_score;
    let user = account_service::recalculate_trust(&mut conn, user_id)?;

    if user.trust_score != before {
        publisher::publish_status_changed(&state.rabbitmq, &user).await;
    }
    tracing::info!(admin_id = %admin.id, user_id = %user_id, trust_score = user.trust_score, "trust score recalculated by admin");

    Ok(Json(ApiResponse::ok(user.into())))
}
