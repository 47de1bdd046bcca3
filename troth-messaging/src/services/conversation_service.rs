use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use troth_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Conversation, ConversationMember, Message, NewConversation, NewConversationMember};
use crate::schema::{conversation_members, conversations, messages};

/// Creates the conversation for a match with both members. Replayed events
/// find the existing row through the unique match id and change nothing.
pub fn open_for_match(
    conn: &mut PgConnection,
    match_id: Uuid,
    user_a: Uuid,
    user_b: Uuid,
) -> AppResult<(Conversation, bool)> {
    conn.transaction::<_, AppError, _>(|conn| {
        let inserted = diesel::insert_into(conversations::table)
            .values(&NewConversation { match_id })
            .on_conflict(conversations::match_id)
            .do_nothing()
            .get_result::<Conversation>(conn)
            .optional()?;

        let Some(created) = inserted else {
            let existing = conversations::table
                .filter(conversations::match_id.eq(match_id))
                .first::<Conversation>(conn)?;
            return Ok((existing, false));
        };

        let members = [user_a, user_b].map(|user_id| NewConversationMember {
            conversation_id: created.id,
            user_id,
        });
        diesel::insert_into(conversation_members::table)
            .values(&members[..])
            .on_conflict((conversation_members::conversation_id, conversation_members::user_id))
            .do_nothing()
            .execute(conn)?;

        Ok((created, true))
    })
}

/// Marks the match's conversation closed. History stays readable.
pub fn close_for_match(conn: &mut PgConnection, match_id: Uuid) -> AppResult<Option<Conversation>> {
    let now = Utc::now();
    let closed = diesel::update(
        conversations::table
            .filter(conversations::match_id.eq(match_id))
            .filter(conversations::is_closed.eq(false)),
    )
    .set((
        conversations::is_closed.eq(true),
        conversations::closed_at.eq(Some(now)),
        conversations::updated_at.eq(now),
    ))
    .get_result::<Conversation>(conn)
    .optional()?;
    Ok(closed)
}

/// Loads a conversation together with the caller's membership row.
pub fn membership(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> AppResult<(Conversation, ConversationMember)> {
    let conversation = conversations::table
        .find(conversation_id)
        .first::<Conversation>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ConversationNotFound, "conversation not found"))?;

    let member = conversation_members::table
        .filter(conversation_members::conversation_id.eq(conversation_id))
        .filter(conversation_members::user_id.eq(user_id))
        .first::<ConversationMember>(conn)
        .optional()?
        .ok_or_else(|| {
            AppError::new(ErrorCode::NotConversationMember, "you are not a member of this conversation")
        })?;

    Ok((conversation, member))
}

pub fn other_members(conn: &mut PgConnection, conversation_id: Uuid, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let ids = conversation_members::table
        .filter(conversation_members::conversation_id.eq(conversation_id))
        .filter(conversation_members::user_id.ne(user_id))
        .select(conversation_members::user_id)
        .load::<Uuid>(conn)?;
    Ok(ids)
}

pub fn last_message(conn: &mut PgConnection, conversation_id: Uuid) -> AppResult<Option<Message>> {
    let found = messages::table
        .filter(messages::conversation_id.eq(conversation_id))
        .filter(messages::is_deleted.eq(false))
        .order(messages::created_at.desc())
        .first::<Message>(conn)
        .optional()?;
    Ok(found)
}

/// Messages from others the member has not read yet.
pub fn unread_in(conn: &mut PgConnection, member: &ConversationMember) -> AppResult<i64> {
    let count = messages::table
        .filter(messages::conversation_id.eq(member.conversation_id))
        .filter(messages::sender_id.ne(member.user_id))
        .filter(messages::is_deleted.eq(false))
        .filter(messages::created_at.gt(member.last_read_at))
        .count()
        .get_result(conn)?;
    Ok(count)
}

pub fn total_unread(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    let count = messages::table
        .inner_join(
            conversation_members::table
                .on(conversation_members::conversation_id.eq(messages::conversation_id)),
        )
        .filter(conversation_members::user_id.eq(user_id))
        .filter(messages::sender_id.ne(user_id))
        .filter(messages::is_deleted.eq(false))
        .filter(messages::created_at.gt(conversation_members::last_read_at))
        .count()
        .get_result(conn)?;
    Ok(count)
}

pub fn mark_read(conn: &mut PgConnection, member: &ConversationMember) -> AppResult<()> {
    let now = Utc::now();
    diesel::update(conversation_members::table.find(member.id))
        .set(conversation_members::last_read_at.eq(now))
        .execute(conn)?;
    Ok(())
}
