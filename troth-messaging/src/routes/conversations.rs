use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::AppResult;
use troth_shared::types::api::ApiResponse;
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{self, Conversation, ConversationMember};
use crate::schema::{conversation_members, conversations};
use crate::services::conversation_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LastMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationPreview {
    pub id: Uuid,
    pub match_id: Uuid,
    pub partner_ids: Vec<Uuid>,
    pub is_closed: bool,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub updated_at: DateTime<Utc>,
}

/// GET /conversations - the caller's conversations, most recent activity first
pub async fn list_conversations(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<ConversationPreview>>>> {
    let mut conn = get_conn(&state.db)?;

    let rows = conversation_members::table
        .inner_join(conversations::table)
        .filter(conversation_members::user_id.eq(user.id))
        .order(conversations::updated_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<(ConversationMember, Conversation)>(&mut conn)?;

    let total: i64 = conversation_members::table
        .filter(conversation_members::user_id.eq(user.id))
        .count()
        .get_result(&mut conn)?;

    let mut items = Vec::with_capacity(rows.len());
    for (member, conversation) in rows {
        let last_message = conversation_service::last_message(&mut conn, conversation.id)?.map(|m| LastMessage {
            id: m.id,
            sender_id: m.sender_id,
            preview: models::preview(&m.content),
            created_at: m.created_at,
        });
        items.push(ConversationPreview {
            id: conversation.id,
            match_id: conversation.match_id,
            partner_ids: conversation_service::other_members(&mut conn, conversation.id, user.id)?,
            is_closed: conversation.is_closed,
            last_message,
            unread_count: conversation_service::unread_in(&mut conn, &member)?,
            updated_at: conversation.updated_at,
        });
    }

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}
