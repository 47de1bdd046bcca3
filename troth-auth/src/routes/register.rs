use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::{TokenPair, UserRole};
use troth_shared::types::ApiResponse;

use crate::models::{NewUser, User};
use crate::schema::users;
use crate::services::{auth_service, token_service};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    auth_service::validate_password(&req.password)?;

    let email = req.email.trim().to_lowercase();
    let password_hash = auth_service::hash_password(&req.password)?;
    let mut conn = get_conn(&state.db)?;

    let (user, code, token_pair) = conn.transaction::<_, AppError, _>(|conn| {
        let exists: i64 = users::table
            .filter(users::email.eq(&email))
            .count()
            .get_result(conn)?;
        if exists > 0 {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }

        let user: User = diesel::insert_into(users::table)
            .values(&NewUser { email: email.clone(), password_hash })
            .get_result(conn)?;

        let code = auth_service::issue_verification_code(conn, user.id)?;
        let token_pair = token_service::issue_session(conn, &state.config, user.id, UserRole::User, None)?;
        Ok((user, code, token_pair))
    })?;

    if let Err(e) = state.email.send_verification_code(&user.email, &code).await {
        tracing::error!(error = %e, "failed to send verification email");
    }

    crate::events::publisher::publish_user_registered(&state.rabbitmq, user.id, &user.email).await;

    tracing::info!(user_id = %user.id, "user registered");

    Ok(Json(ApiResponse::ok(token_pair)))
}
