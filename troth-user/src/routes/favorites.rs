use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};
use troth_shared::types::{Ack, ApiResponse};

use crate::events::publisher;
use crate::lifecycle::MatchSource;
use crate::models::{Favorite, Match, NewFavorite, Profile, ProfileCard};
use crate::schema::{favorites, profiles};
use crate::services::{match_service, on_unique_violation, profile_service};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub favorite: Favorite,
    /// Set when the favorite was mutual and created a match
    pub match_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct FavoriteEntry {
    pub id: Uuid,
    pub profile: ProfileCard,
    pub created_at: chrono::DateTime<Utc>,
}

// --- POST /favorites/:id ---

pub async fn add_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteResponse>>> {
    if target_id == user.id {
        return Err(AppError::new(ErrorCode::CannotTargetSelf, "cannot favorite yourself"));
    }

    let mut conn = get_conn(&state.db)?;

    let (favorite, created_match): (Favorite, Option<Match>) = conn.transaction::<_, AppError, _>(|conn| {
        let (me, target) = profile_service::lock_pair(conn, user.id, target_id)?;
        if me.status().is_banned() {
            return Err(AppError::new(ErrorCode::UserBanned, "account is banned"));
        }
        if !target.is_discoverable() {
            return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
        }

        let favorite = diesel::insert_into(favorites::table)
            .values(&NewFavorite { user_id: user.id, favorite_user_id: target_id })
            .get_result::<Favorite>(conn)
            .map_err(|e| on_unique_violation(e, ErrorCode::FavoriteAlreadyExists, "already in favorites"))?;

        let reciprocal: i64 = favorites::table
            .filter(favorites::user_id.eq(target_id))
            .filter(favorites::favorite_user_id.eq(user.id))
            .count()
            .get_result(conn)?;

        let created_match = if reciprocal > 0 {
            let (found, created) = match_service::ensure_match(conn, user.id, target_id, MatchSource::Favorite)?;
            created.then_some(found)
        } else {
            None
        };
        Ok((favorite, created_match))
    })?;

    if let Some(created) = &created_match {
        publisher::publish_match_created(&state.rabbitmq, created).await;
    }

    tracing::info!(user_id = %user.id, target_id = %target_id, mutual = created_match.is_some(), "favorite added");

    Ok(Json(ApiResponse::ok(FavoriteResponse {
        favorite,
        match_id: created_match.map(|m| m.id),
    })))
}

// --- DELETE /favorites/:id ---

pub async fn remove_favorite(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let mut conn = get_conn(&state.db)?;

    let deleted = diesel::delete(
        favorites::table
            .filter(favorites::user_id.eq(user.id))
            .filter(favorites::favorite_user_id.eq(target_id)),
    )
    .execute(&mut conn)?;

    if deleted == 0 {
        return Err(AppError::new(ErrorCode::FavoriteNotFound, "favorite not found"));
    }

    Ok(Json(ApiResponse::ok(Ack::done())))
}

// --- GET /favorites ---

pub async fn list_favorites(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<FavoriteEntry>>>> {
    let mut conn = get_conn(&state.db)?;

    let rows = favorites::table
        .inner_join(profiles::table.on(profiles::user_id.eq(favorites::favorite_user_id)))
        .filter(favorites::user_id.eq(user.id))
        .order(favorites::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .select((favorites::all_columns, profiles::all_columns))
        .load::<(Favorite, Profile)>(&mut conn)?;

    let total: i64 = favorites::table
        .filter(favorites::user_id.eq(user.id))
        .count()
        .get_result(&mut conn)?;

    let today = Utc::now().date_naive();
    let items = rows
        .into_iter()
        .map(|(favorite, profile)| FavoriteEntry {
            id: favorite.id,
            profile: ProfileCard::from_profile(&profile, today),
            created_at: favorite.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}
