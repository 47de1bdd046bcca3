use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use troth_shared::clients::db::get_conn;
use troth_shared::errors::{AppError, AppResult, ErrorCode};
use troth_shared::types::api::{Ack, ApiResponse};
use troth_shared::types::auth::AuthUser;
use troth_shared::types::pagination::{Paginated, PaginationParams};

use crate::events::publisher;
use crate::models::{self, Conversation, Message, NewMessage};
use crate::schema::{conversations, messages};
use crate::services::conversation_service;
use crate::AppState;

// --- Request DTOs ---

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

// --- Response DTOs ---

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub total_unread: i64,
}

// --- Handlers ---

/// GET /conversations/:id/messages - newest first, deleted messages omitted
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let mut conn = get_conn(&state.db)?;
    conversation_service::membership(&mut conn, conversation_id, user.id)?;

    let visible = || {
        messages::conversation_id
            .eq(conversation_id)
            .and(messages::is_deleted.eq(false))
    };

    let total: i64 = messages::table.filter(visible()).count().get_result(&mut conn)?;
    let items = messages::table
        .filter(visible())
        .order(messages::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Message>(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

/// POST /conversations/:id/messages
pub async fn send_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<Json<ApiResponse<Message>>> {
    let content = models::normalize_content(&req.content)?;
    let mut conn = get_conn(&state.db)?;

    let (conversation, message, recipients) = conn.transaction::<_, AppError, _>(|conn| {
        conversation_service::membership(conn, conversation_id, user.id)?;
        // Lock so a concurrent close is seen before the insert
        let conversation = conversations::table
            .find(conversation_id)
            .for_update()
            .first::<Conversation>(conn)?;
        if conversation.is_closed {
            return Err(AppError::new(
                ErrorCode::ConversationClosed,
                "this conversation is closed because the match was removed",
            ));
        }

        let message: Message = diesel::insert_into(messages::table)
            .values(&NewMessage { conversation_id, sender_id: user.id, content })
            .get_result(conn)?;

        diesel::update(conversations::table.find(conversation_id))
            .set(conversations::updated_at.eq(message.created_at))
            .execute(conn)?;

        let recipients = conversation_service::other_members(conn, conversation_id, user.id)?;
        Ok((conversation, message, recipients))
    })?;

    publisher::publish_message_sent(&state.rabbitmq, &conversation, &message, recipients).await;

    tracing::info!(
        sender_id = %user.id,
        conversation_id = %conversation_id,
        message_id = %message.id,
        "message sent"
    );

    Ok(Json(ApiResponse::ok(message)))
}

/// POST /conversations/:id/read - move the caller's read marker to now
pub async fn mark_as_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let mut conn = get_conn(&state.db)?;
    let (_, member) = conversation_service::membership(&mut conn, conversation_id, user.id)?;
    conversation_service::mark_read(&mut conn, &member)?;

    Ok(Json(ApiResponse::ok(Ack::done())))
}

/// DELETE /messages/:id - only the sender may delete; the row is kept
pub async fn delete_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(message_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let mut conn = get_conn(&state.db)?;

    let message = messages::table
        .find(message_id)
        .filter(messages::is_deleted.eq(false))
        .first::<Message>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MessageNotFound, "message not found"))?;

    if message.sender_id != user.id {
        return Err(AppError::new(ErrorCode::Forbidden, "you can only delete your own messages"));
    }

    diesel::update(messages::table.find(message_id))
        .set(messages::is_deleted.eq(true))
        .execute(&mut conn)?;

    tracing::info!(user_id = %user.id, message_id = %message_id, "message deleted");

    Ok(Json(ApiResponse::ok(Ack::done())))
}

/// GET /unread-count - unread messages across all conversations
pub async fn get_unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let mut conn = get_conn(&state.db)?;
    let total_unread = conversation_service::total_unread(&mut conn, user.id)?;

    Ok(Json(ApiResponse::ok(UnreadCountResponse { total_unread })))
}
