use axum::extract::State;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::TokenPair;
use troth_shared::types::ApiResponse;

use crate::models::RefreshToken;
use crate::schema::refresh_tokens;
use crate::services::{account_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let token_hash = token_service::hash_token(&req.refresh_token);
    let mut conn = get_conn(&state.db)?;

    let token_pair = conn.transaction::<_, AppError, _>(|conn| {
        let stored: RefreshToken = refresh_tokens::table
            .filter(refresh_tokens::token_hash.eq(&token_hash))
            .filter(refresh_tokens::revoked_at.is_null())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::TokenInvalid, "invalid refresh token"))?;

        if stored.expires_at < Utc::now() {
            return Err(AppError::new(ErrorCode::TokenExpired, "refresh token expired"));
        }

        diesel::update(refresh_tokens::table.find(stored.id))
            .set(refresh_tokens::revoked_at.eq(Some(Utc::now())))
            .execute(conn)?;

        let user = account_service::find_user(conn, stored.user_id)?;
        if user.ban_in_force(Utc::now()) {
            return Err(AppError::new(ErrorCode::UserBanned, "account is banned"));
        }

        token_service::issue_session(conn, &state.config, user.id, user.role(), stored.device_fingerprint)
    })?;

    Ok(Json(ApiResponse::ok(token_pair)))
}
