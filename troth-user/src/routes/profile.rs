use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::ApiResponse;

use crate::models::{Profile, UpdateProfile};
use crate::schema::profiles;
use crate::services::profile_service;
use crate::AppState;

// --- GET /me ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = get_conn(&state.db)?;
    let profile = profile_service::find_by_user(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PATCH /me ---

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(mut payload): Json<UpdateProfile>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    payload.display_name = payload.display_name.map(|n| n.trim().to_string());
    payload.country = payload.country.map(|c| c.trim().to_uppercase());
    payload
        .validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    if let Some(birth_date) = payload.birth_date {
        if crate::lifecycle::age_on(birth_date, Utc::now().date_naive()) < 18 {
            return Err(AppError::new(ErrorCode::ValidationError, "members must be at least 18 years old"));
        }
    }

    let mut conn = get_conn(&state.db)?;

    let updated = diesel::update(profiles::table.filter(profiles::user_id.eq(user.id)))
        .set((&payload, profiles::updated_at.eq(Utc::now())))
        .get_result::<Profile>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    tracing::info!(user_id = %user.id, "profile updated");

    Ok(Json(ApiResponse::ok(updated)))
}

// --- GET /profiles/:id --- (by user id)

pub async fn get_public_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let mut conn = get_conn(&state.db)?;

    let profile = if user_id == user.id {
        profile_service::find_by_user(&mut conn, user_id)?
    } else {
        profile_service::find_visible(&mut conn, user_id)?
    };

    Ok(Json(ApiResponse::ok(profile)))
}
