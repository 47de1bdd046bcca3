use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::clients::minio::image_extension;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::ApiResponse;

use crate::schema::profiles;
use crate::services::profile_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PhotoUploadResponse {
    pub photo_url: String,
}

pub async fn upload_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<PhotoUploadResponse>>> {
    let profile = {
        let mut conn = get_conn(&state.db)?;
        profile_service::find_by_user(&mut conn, user.id)?
    };

    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read multipart: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::PhotoUploadFailed, "no file provided"))?;

    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let ext = image_extension(&content_type).ok_or_else(|| {
        AppError::new(ErrorCode::PhotoUploadFailed, "unsupported image format, accepted: jpeg, png, webp")
    })?;

    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read file data: {e}")))?;
    if data.is_empty() {
        return Err(AppError::new(ErrorCode::PhotoUploadFailed, "file is empty"));
    }

    let key = format!("profiles/{}/{}.{}", profile.user_id, Uuid::now_v7(), ext);
    let photo_url = state
        .minio
        .upload(&key, data.to_vec(), &content_type)
        .await
        .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e))?;

    let mut conn = get_conn(&state.db)?;
    diesel::update(profiles::table.find(profile.id))
        .set((
            profiles::photo_url.eq(&photo_url),
            profiles::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

    tracing::info!(user_id = %user.id, photo_url = %photo_url, "profile photo uploaded");

    Ok(Json(ApiResponse::ok(PhotoUploadResponse { photo_url })))
}
