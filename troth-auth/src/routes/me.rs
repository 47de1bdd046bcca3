use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::AppResult;
use troth_shared::types::account::{AccountStatus, VerificationFlags};
use troth_shared::types::auth::{AuthUser, UserRole};
use troth_shared::types::ApiResponse;

use crate::models::User;
use crate::services::account_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
    pub account_status: AccountStatus,
    pub trust_score: i32,
    pub verifications: VerificationFlags,
    pub ban_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            role: user.role(),
            account_status: user.status(),
            verifications: user.flags(),
            trust_score: user.trust_score,
            ban_until: user.ban_until,
            created_at: user.created_at,
            email: user.email,
        }
    }
}

pub async fn me(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let mut conn = get_conn(&state.db)?;
    let account = account_service::find_user(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(account.into())))
}
