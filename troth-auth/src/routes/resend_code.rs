use axum::extract::State;
use axum::Json;
use std::sync::Arc;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::{Ack, ApiResponse};

use crate::services::{account_service, auth_service};
use crate::AppState;

pub async fn resend_code(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let mut conn = get_conn(&state.db)?;
    let account = account_service::find_user(&mut conn, user.id)?;

    if account.email_verified {
        return Ok(Json(ApiResponse::ok_with_message(Ack::done(), "email already verified")));
    }

    // One code per minute per address
    let rate_key = format!("verify:rate:{}", account.email);
    let allowed = state.redis.rate_limit_check(&rate_key, 1, 60).await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "rate limit check failed, allowing request");
        true
    });
    if !allowed {
        return Err(AppError::new(ErrorCode::EmailRateLimited, "please wait before requesting a new code"));
    }

    let code = auth_service::issue_verification_code(&mut conn, account.id)?;
    if let Err(e) = state.email.send_verification_code(&account.email, &code).await {
        tracing::error!(error = %e, "failed to send verification email");
    }

    Ok(Json(ApiResponse::ok_with_message(Ack::done(), "verification code sent")))
}
