use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};
use troth_shared::types::{Ack, ApiResponse};

use crate::events::publisher;
use crate::models::{Match, Profile, ProfileCard};
use crate::schema::{matches, profiles};
use crate::services::match_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MatchEntry {
    pub id: Uuid,
    pub partner_id: Uuid,
    pub partner: Option<ProfileCard>,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

// --- GET /matches ---

pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<MatchEntry>>>> {
    let mut conn = get_conn(&state.db)?;
    let mine = || matches::user_a_id.eq(user.id).or(matches::user_b_id.eq(user.id));

    let rows = matches::table
        .filter(mine())
        .order(matches::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Match>(&mut conn)?;
    let total: i64 = matches::table.filter(mine()).count().get_result(&mut conn)?;

    let partner_ids: Vec<Uuid> = rows.iter().filter_map(|m| m.partner_of(user.id)).collect();
    let partners = profiles::table
        .filter(profiles::user_id.eq_any(&partner_ids))
        .load::<Profile>(&mut conn)?;

    let today = Utc::now().date_naive();
    let items = rows
        .into_iter()
        .filter_map(|m| {
            let partner_id = m.partner_of(user.id)?;
            let partner = partners
                .iter()
                .find(|p| p.user_id == partner_id)
                .filter(|p| p.is_discoverable())
                .map(|p| ProfileCard::from_profile(p, today));
            Some(MatchEntry { id: m.id, partner_id, partner, source: m.source, created_at: m.created_at })
        })
        .collect();

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

// --- DELETE /matches/:id ---

pub async fn unmatch(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let mut conn = get_conn(&state.db)?;

    let (removed, closed) = conn.transaction::<_, AppError, _>(|conn| {
        let found = match_service::lock_for_member(conn, match_id, user.id)?;
        let closed = match_service::remove_match(conn, &found)?;
        Ok((found, closed))
    })?;

    publisher::publish_match_removed(&state.rabbitmq, &removed, user.id).await;

    tracing::info!(user_id = %user.id, match_id = %match_id, closed_proposals = closed, "unmatched");

    Ok(Json(ApiResponse::ok(Ack::done())))
}
