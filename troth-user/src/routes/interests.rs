use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};
use troth_shared::types::ApiResponse;

use crate::events::publisher;
use crate::lifecycle::{InterestStatus, MatchSource, QuotaLimits};
use crate::models::{Interest, Match, NewInterest, Profile, ProfileCard};
use crate::schema::{interests, profiles};
use crate::services::quota_service::{self, QuotaStatus};
use crate::services::{match_service, on_unique_violation, profile_service};
use crate::AppState;

// --- Request / Response types ---

#[derive(Debug, Deserialize, Validate)]
pub struct SendInterestRequest {
    pub receiver_id: Uuid,
    #[validate(length(max = 500, message = "message must be at most 500 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondInterestRequest {
    pub accept: bool,
}

#[derive(Debug, Deserialize)]
pub struct InterestFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<InterestStatus>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl InterestFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InterestResponse {
    pub interest: Interest,
    /// Set when the interest resolved into a match
    pub match_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct InterestEntry {
    #[serde(flatten)]
    pub interest: Interest,
    /// The other party: sender for received interests, receiver for sent ones
    pub profile: ProfileCard,
}

fn limits(state: &AppState) -> QuotaLimits {
    QuotaLimits {
        limited: state.config.interest_quota_limited,
        verified: state.config.interest_quota_verified,
    }
}

// --- POST /interests ---

pub async fn send_interest(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendInterestRequest>,
) -> AppResult<Json<ApiResponse<InterestResponse>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    if req.receiver_id == user.id {
        return Err(AppError::new(ErrorCode::CannotTargetSelf, "cannot send interest to yourself"));
    }

    let mut conn = get_conn(&state.db)?;
    let sender = profile_service::find_by_user(&mut conn, user.id)?;
    if sender.status().is_banned() {
        return Err(AppError::new(ErrorCode::UserBanned, "account is banned"));
    }

    let slot = quota_service::consume_interest(&state.redis, limits(&state), user.id, sender.status()).await?;

    let message = req.message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());

    let outcome = conn.transaction::<_, AppError, _>(|conn| {
        let (_, receiver) = profile_service::lock_pair(conn, user.id, req.receiver_id)?;
        if !receiver.is_discoverable() {
            return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
        }

        if match_service::find_between(conn, user.id, req.receiver_id)?.is_some() {
            return Err(AppError::new(ErrorCode::InterestAlreadyResolved, "you are already matched"));
        }

        let already_sent: i64 = interests::table
            .filter(interests::sender_id.eq(user.id))
            .filter(interests::receiver_id.eq(req.receiver_id))
            .filter(interests::status.eq(InterestStatus::Pending.as_str()))
            .count()
            .get_result(conn)?;
        if already_sent > 0 {
            return Err(AppError::new(ErrorCode::InterestAlreadySent, "interest already pending"));
        }

        let reverse: Option<Interest> = interests::table
            .filter(interests::sender_id.eq(req.receiver_id))
            .filter(interests::receiver_id.eq(user.id))
            .filter(interests::status.eq(InterestStatus::Pending.as_str()))
            .first::<Interest>(conn)
            .optional()?;

        let now = Utc::now();
        let interest = diesel::insert_into(interests::table)
            .values(&NewInterest {
                sender_id: user.id,
                receiver_id: req.receiver_id,
                message: message.clone(),
            })
            .get_result::<Interest>(conn)
            .map_err(|e| on_unique_violation(e, ErrorCode::InterestAlreadySent, "interest already pending"))?;

        let Some(reverse) = reverse else {
            return Ok((interest, None));
        };

        // Both sides want this: accept both and match
        let accepted = InterestStatus::Pending.respond(true)?;
        diesel::update(interests::table.filter(interests::id.eq_any([reverse.id, interest.id])))
            .set((
                interests::status.eq(accepted.as_str()),
                interests::responded_at.eq(Some(now)),
                interests::updated_at.eq(now),
            ))
            .execute(conn)?;
        let interest = interests::table.find(interest.id).first::<Interest>(conn)?;

        let (found, created) = match_service::ensure_match(conn, user.id, req.receiver_id, MatchSource::Interest)?;
        Ok((interest, Some((found, created))))
    });
    // Rejected interests do not count against the allowance
    let (interest, created_match) = quota_service::settle_interest(&state.redis, slot, outcome).await?;

    match &created_match {
        Some((found, created)) => {
            if *created {
                publisher::publish_match_created(&state.rabbitmq, found).await;
            }
            tracing::info!(user_id = %user.id, receiver_id = %req.receiver_id, match_id = %found.id, "mutual interest matched");
        }
        None => {
            publisher::publish_interest_sent(&state.rabbitmq, &interest, &sender.label()).await;
            tracing::info!(user_id = %user.id, receiver_id = %req.receiver_id, "interest sent");
        }
    }

    Ok(Json(ApiResponse::ok(InterestResponse {
        interest,
        match_id: created_match.map(|(m, _)| m.id),
    })))
}

// --- PUT /interests/:id/respond ---

pub async fn respond_interest(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(interest_id): Path<Uuid>,
    Json(req): Json<RespondInterestRequest>,
) -> AppResult<Json<ApiResponse<InterestResponse>>> {
    let mut conn = get_conn(&state.db)?;

    let (interest, receiver, created_match): (Interest, Profile, Option<(Match, bool)>) =
        conn.transaction::<_, AppError, _>(|conn| {
            let interest = interests::table
                .find(interest_id)
                .for_update()
                .first::<Interest>(conn)
                .optional()?
                .ok_or_else(|| AppError::new(ErrorCode::InterestNotFound, "interest not found"))?;

            if interest.receiver_id != user.id {
                return Err(AppError::new(ErrorCode::Forbidden, "only the receiver can respond to an interest"));
            }

            let next = interest.status().respond(req.accept)?;
            let (receiver, _) = profile_service::lock_pair(conn, user.id, interest.sender_id)?;
            if receiver.status().is_banned() {
                return Err(AppError::new(ErrorCode::UserBanned, "account is banned"));
            }

            let now = Utc::now();
            let interest = diesel::update(interests::table.find(interest_id))
                .set((
                    interests::status.eq(next.as_str()),
                    interests::responded_at.eq(Some(now)),
                    interests::updated_at.eq(now),
                ))
                .get_result::<Interest>(conn)?;

            let created_match = if next == InterestStatus::Accepted {
                Some(match_service::ensure_match(conn, interest.sender_id, interest.receiver_id, MatchSource::Interest)?)
            } else {
                None
            };
            Ok((interest, receiver, created_match))
        })?;

    publisher::publish_interest_responded(&state.rabbitmq, &interest, &receiver.label(), req.accept).await;
    if let Some((found, true)) = &created_match {
        publisher::publish_match_created(&state.rabbitmq, found).await;
    }

    tracing::info!(
        user_id = %user.id,
        interest_id = %interest_id,
        status = %interest.status,
        "interest answered"
    );

    Ok(Json(ApiResponse::ok(InterestResponse {
        interest,
        match_id: created_match.map(|(m, _)| m.id),
    })))
}

// --- DELETE /interests/:id ---

pub async fn withdraw_interest(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(interest_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Interest>>> {
    let mut conn = get_conn(&state.db)?;

    let interest = conn.transaction::<_, AppError, _>(|conn| {
        let interest = interests::table
            .find(interest_id)
            .for_update()
            .first::<Interest>(conn)
            .optional()?
            .filter(|i| i.sender_id == user.id)
            .ok_or_else(|| AppError::new(ErrorCode::InterestNotFound, "interest not found"))?;

        let next = interest.status().withdraw()?;
        let updated = diesel::update(interests::table.find(interest_id))
            .set((interests::status.eq(next.as_str()), interests::updated_at.eq(Utc::now())))
            .get_result::<Interest>(conn)?;
        Ok(updated)
    })?;

    tracing::info!(user_id = %user.id, interest_id = %interest_id, "interest withdrawn");

    Ok(Json(ApiResponse::ok(interest)))
}

// --- GET /interests/received, GET /interests/sent ---

pub async fn list_received(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<InterestFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<InterestEntry>>>> {
    list(&state, user.id, Direction::Received, &params)
}

pub async fn list_sent(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<InterestFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<InterestEntry>>>> {
    list(&state, user.id, Direction::Sent, &params)
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Sent,
    Received,
}

fn list(
    state: &AppState,
    user_id: Uuid,
    direction: Direction,
    params: &InterestFilterParams,
) -> AppResult<Json<ApiResponse<Paginated<InterestEntry>>>> {
    let mut conn = get_conn(&state.db)?;
    let pagination = params.pagination();

    let filtered = || {
        let mut query: interests::BoxedQuery<'_, Pg> = interests::table.into_boxed();
        query = match direction {
            Direction::Sent => query.filter(interests::sender_id.eq(user_id)),
            Direction::Received => query.filter(interests::receiver_id.eq(user_id)),
        };
        if let Some(status) = params.status {
            query = query.filter(interests::status.eq(status.as_str()));
        }
        query
    };

    let rows = filtered()
        .order(interests::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Interest>(&mut conn)?;
    let total: i64 = filtered().count().get_result(&mut conn)?;

    let other = |i: &Interest| match direction {
        Direction::Sent => i.receiver_id,
        Direction::Received => i.sender_id,
    };
    let other_ids: Vec<Uuid> = rows.iter().map(other).collect();
    let others = profiles::table
        .filter(profiles::user_id.eq_any(&other_ids))
        .load::<Profile>(&mut conn)?;

    let today = Utc::now().date_naive();
    let items = rows
        .into_iter()
        .filter_map(|interest| {
            let profile = others.iter().find(|p| p.user_id == other(&interest))?;
            Some(InterestEntry { profile: ProfileCard::from_profile(profile, today), interest })
        })
        .collect();

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

// --- GET /interests/quota ---

pub async fn quota(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<QuotaStatus>>> {
    let status = {
        let mut conn = get_conn(&state.db)?;
        profile_service::find_by_user(&mut conn, user.id)?.status()
    };
    let quota = quota_service::current(&state.redis, limits(&state), user.id, status).await;
    Ok(Json(ApiResponse::ok(quota)))
}
