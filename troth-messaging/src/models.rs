use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use troth_shared::errors::{AppError, ErrorCode};

use crate::schema::{conversation_members, conversations, messages};

pub const MAX_MESSAGE_CHARS: usize = 2000;
const PREVIEW_CHARS: usize = 100;

// --- Conversation ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversations)]
pub struct Conversation {
    pub id: Uuid,
    pub match_id: Uuid,
    pub is_closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversations)]
pub struct NewConversation {
    pub match_id: Uuid,
}

// --- ConversationMember ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversation_members)]
pub struct ConversationMember {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub last_read_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversation_members)]
pub struct NewConversationMember {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

/// Trims a message body and enforces the 1-2000 character range.
pub fn normalize_content(raw: &str) -> Result<String, AppError> {
    let content = raw.trim();
    let chars = content.chars().count();
    if chars == 0 {
        return Err(AppError::new(ErrorCode::ValidationError, "message cannot be empty"));
    }
    if chars > MAX_MESSAGE_CHARS {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("message must be at most {MAX_MESSAGE_CHARS} characters"),
        ));
    }
    Ok(content.to_string())
}

/// Short excerpt carried in events and conversation lists.
pub fn preview(content: &str) -> String {
    let mut excerpt: String = content.chars().take(PREVIEW_CHARS).collect();
    if content.chars().count() > PREVIEW_CHARS {
        excerpt.push('…');
    }
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_trimmed() {
        assert_eq!(normalize_content("  salaam  ").unwrap(), "salaam");
    }

    #[test]
    fn blank_content_is_rejected() {
        let err = normalize_content(" \n\t ").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
    }

    #[test]
    fn length_limit_counts_characters() {
        let at_limit = "é".repeat(MAX_MESSAGE_CHARS);
        assert!(normalize_content(&at_limit).is_ok());
        assert!(normalize_content(&format!("{at_limit}é")).is_err());
    }

    #[test]
    fn preview_truncates_long_messages() {
        assert_eq!(preview("hello"), "hello");
        let long = "a".repeat(150);
        let short = preview(&long);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 1);
        assert!(short.ends_with('…'));
    }
}
