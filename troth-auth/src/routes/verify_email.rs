use axum::extract::State;
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::account::VerificationKind;
use troth_shared::types::auth::AuthUser;
use troth_shared::types::ApiResponse;

use crate::models::EmailVerification;
use crate::routes::me::AccountResponse;
use crate::schema::email_verifications;
use crate::services::account_service;
use crate::AppState;

/// Wrong or right, each code submission counts against this window.
const MAX_ATTEMPTS: u64 = 5;
const ATTEMPT_WINDOW_SECS: u64 = 15 * 60;

fn attempt_key(user_id: Uuid) -> String {
    format!("verify:attempts:{user_id}")
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub code: String,
}

pub async fn verify_email(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyEmailRequest>,
) -> AppResult<Json<ApiResponse<AccountResponse>>> {
    let allowed = state
        .redis
        .rate_limit_check(&attempt_key(user.id), MAX_ATTEMPTS, ATTEMPT_WINDOW_SECS)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "rate limit check failed, allowing request");
            true
        });
    if !allowed {
        tracing::warn!(user_id = %user.id, "too many verification attempts");
        return Err(AppError::new(ErrorCode::RateLimited, "too many attempts, try again later"));
    }

    let mut conn = get_conn(&state.db)?;

    let verification = email_verifications::table
        .filter(email_verifications::user_id.eq(user.id))
        .filter(email_verifications::used_at.is_null())
        .filter(email_verifications::code.eq(req.code.trim()))
        .order(email_verifications::created_at.desc())
        .first::<EmailVerification>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::VerificationCodeInvalid, "invalid verification code"))?;

    if verification.expires_at < Utc::now() {
        return Err(AppError::new(ErrorCode::VerificationCodeExpired, "verification code expired"));
    }

    diesel::update(email_verifications::table.find(verification.id))
        .set(email_verifications::used_at.eq(Some(Utc::now())))
        .execute(&mut conn)?;

    let (account, update) =
        account_service::process_verification(&mut conn, user.id, VerificationKind::Email)?;
    if update.changed {
        crate::events::publisher::publish_status_changed(&state.rabbitmq, &account).await;
    }

    tracing::info!(user_id = %user.id, "email verified");

    Ok(Json(ApiResponse::ok_with_message(account.into(), "email verified")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempts_are_counted_per_user() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        assert_ne!(attempt_key(a), attempt_key(b));
        assert_eq!(attempt_key(a), attempt_key(a));
    }

    #[test]
    fn too_many_attempts_is_a_rate_limit() {
        let err = AppError::new(ErrorCode::RateLimited, "too many attempts, try again later");
        assert_eq!(err.code(), ErrorCode::RateLimited);
        assert_eq!(err.code().status_code(), axum::http::StatusCode::TOO_MANY_REQUESTS);
    }
}
