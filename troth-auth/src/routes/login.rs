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

use crate::models::User;
use crate::schema::users;
use crate::services::{account_service, auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_fingerprint: Option<String>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let mut conn = get_conn(&state.db)?;

    let user: User = users::table
        .filter(users::email.eq(req.email.trim().to_lowercase()))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"))?;

    let valid = auth_service::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(AppError::new(ErrorCode::InvalidCredentials, "invalid email or password"));
    }

    let now = Utc::now();
    let user = if user.ban_in_force(now) {
        return Err(match user.ban_until {
            Some(until) => AppError::new(
                ErrorCode::UserBanned,
                format!("account banned until {}", until.format("%Y-%m-%d %H:%M UTC")),
            ),
            None => AppError::new(ErrorCode::UserBanned, "account permanently banned"),
        });
    } else if user.status().is_banned() {
        // Ban expired since the last login
        match account_service::lift_ban(&mut conn, user.id, None)? {
            Some(restored) => {
                crate::events::publisher::publish_status_changed(&state.rabbitmq, &restored).await;
                restored
            }
            None => user,
        }
    } else {
        user
    };

    let token_pair = token_service::issue_session(
        &mut conn,
        &state.config,
        user.id,
        user.role(),
        req.device_fingerprint,
    )?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(ApiResponse::ok(token_pair)))
}
