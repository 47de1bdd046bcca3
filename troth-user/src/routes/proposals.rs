use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};
use troth_shared::types::ApiResponse;

use crate::events::publisher;
use crate::lifecycle::ProposalAnswer;
use crate::models::{NewProposal, Proposal};
use crate::schema::{matches, proposals};
use crate::services::{match_service, on_unique_violation, profile_service};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProposalRequest {
    pub recipient_id: Uuid,
    #[validate(length(max = 1000, message = "message must be at most 1000 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RespondProposalRequest {
    pub answer: ProposalAnswer,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    #[default]
    Received,
}

#[derive(Debug, Deserialize)]
pub struct ProposalFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    #[serde(default)]
    pub direction: Direction,
    pub answer: Option<ProposalAnswer>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

// --- POST /proposals ---

pub async fn create_proposal(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProposalRequest>,
) -> AppResult<Json<ApiResponse<Proposal>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    if req.recipient_id == user.id {
        return Err(AppError::new(ErrorCode::CannotTargetSelf, "cannot propose to yourself"));
    }

    let mut conn = get_conn(&state.db)?;
    let proposer = profile_service::find_by_user(&mut conn, user.id)?;
    if proposer.status().is_banned() {
        return Err(AppError::new(ErrorCode::UserBanned, "account is banned"));
    }

    let message = req.message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());

    let proposal = conn.transaction::<_, AppError, _>(|conn| {
        let found = match_service::find_between(conn, user.id, req.recipient_id)?
            .ok_or_else(|| AppError::new(ErrorCode::NotMatched, "proposals require a match"))?;
        // Serializes proposal creation per match
        let found = match_service::lock_for_member(conn, found.id, user.id)?;

        let pending: i64 = proposals::table
            .filter(proposals::match_id.eq(found.id))
            .filter(proposals::answer.eq(ProposalAnswer::Pending.as_str()))
            .count()
            .get_result(conn)?;
        if pending > 0 {
            return Err(AppError::new(ErrorCode::ProposalAlreadyPending, "a proposal is already pending for this match"));
        }

        diesel::insert_into(proposals::table)
            .values(&NewProposal {
                match_id: found.id,
                proposer_id: user.id,
                recipient_id: req.recipient_id,
                message: message.clone(),
            })
            .get_result::<Proposal>(conn)
            .map_err(|e| on_unique_violation(e, ErrorCode::ProposalAlreadyPending, "a proposal is already pending for this match"))
    })?;

    publisher::publish_proposal_sent(&state.rabbitmq, &proposal, &proposer.label()).await;

    tracing::info!(user_id = %user.id, proposal_id = %proposal.id, match_id = %proposal.match_id, "proposal sent");

    Ok(Json(ApiResponse::ok(proposal)))
}

// --- PUT /proposals/:id/respond ---

pub async fn respond_proposal(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(proposal_id): Path<Uuid>,
    Json(req): Json<RespondProposalRequest>,
) -> AppResult<Json<ApiResponse<Proposal>>> {
    let mut conn = get_conn(&state.db)?;
    let recipient = profile_service::find_by_user(&mut conn, user.id)?;

    let proposal = conn.transaction::<_, AppError, _>(|conn| {
        let proposal = proposals::table
            .find(proposal_id)
            .for_update()
            .first::<Proposal>(conn)
            .optional()?
            .filter(|p| p.recipient_id == user.id || p.proposer_id == user.id)
            .ok_or_else(|| AppError::new(ErrorCode::ProposalNotFound, "proposal not found"))?;

        if proposal.recipient_id != user.id {
            return Err(AppError::new(ErrorCode::Forbidden, "only the recipient can answer a proposal"));
        }

        let answer = proposal.answer().answer(req.answer)?;

        // The match may have ended while the proposal was open
        let still_matched: i64 = matches::table
            .filter(matches::id.eq(proposal.match_id))
            .count()
            .get_result(conn)?;
        if still_matched == 0 {
            return Err(AppError::new(ErrorCode::NotMatched, "the match has ended"));
        }

        let now = Utc::now();
        let updated = diesel::update(proposals::table.find(proposal_id))
            .set((
                proposals::answer.eq(answer.as_str()),
                proposals::answered_at.eq(Some(now)),
                proposals::updated_at.eq(now),
            ))
            .get_result::<Proposal>(conn)?;
        Ok(updated)
    })?;

    let published = publisher::publish_proposal_answered(&state.rabbitmq, &proposal, &recipient.label()).await;

    // Moderation follows up on accepted proposals from the event
    let proposal = if published && proposal.answer() == ProposalAnswer::Yes {
        diesel::update(proposals::table.find(proposal.id))
            .set(proposals::admin_notified.eq(true))
            .get_result::<Proposal>(&mut conn)?
    } else {
        proposal
    };

    tracing::info!(
        user_id = %user.id,
        proposal_id = %proposal_id,
        answer = %proposal.answer,
        admin_notified = proposal.admin_notified,
        "proposal answered"
    );

    Ok(Json(ApiResponse::ok(proposal)))
}

// --- GET /proposals ---

pub async fn list_proposals(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ProposalFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<Proposal>>>> {
    let mut conn = get_conn(&state.db)?;
    let pagination = PaginationParams { page: params.page, per_page: params.per_page };

    let filtered = || {
        let mut query: proposals::BoxedQuery<'_, Pg> = proposals::table.into_boxed();
        query = match params.direction {
            Direction::Sent => query.filter(proposals::proposer_id.eq(user.id)),
            Direction::Received => query.filter(proposals::recipient_id.eq(user.id)),
        };
        if let Some(answer) = params.answer {
            query = query.filter(proposals::answer.eq(answer.as_str()));
        }
        query
    };

    let items = filtered()
        .order(proposals::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Proposal>(&mut conn)?;
    let total: i64 = filtered().count().get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}
