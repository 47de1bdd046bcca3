use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// RabbitMQ Event envelope wrapping all domain events.
///
/// Routing key format: `troth.{domain}.{entity}.{action}`
/// Example: `troth.user.interest.sent`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            event_type: event_type.into(),
            timestamp: Utc::now(),
            correlation_id: None,
            user_id: None,
            data,
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

/// RabbitMQ routing keys
pub mod routing_keys {
    // Auth events
    pub const AUTH_USER_REGISTERED: &str = "troth.auth.user.registered";
    pub const AUTH_USER_STATUS_CHANGED: &str = "troth.auth.user.status_changed";

    // Interest / match / proposal events
    pub const USER_INTEREST_SENT: &str = "troth.user.interest.sent";
    pub const USER_INTEREST_RESPONDED: &str = "troth.user.interest.responded";
    pub const USER_MATCH_CREATED: &str = "troth.user.match.created";
    pub const USER_MATCH_REMOVED: &str = "troth.user.match.removed";
    pub const USER_PROPOSAL_SENT: &str = "troth.user.proposal.sent";
    pub const USER_PROPOSAL_ANSWERED: &str = "troth.user.proposal.answered";

    // Messaging events
    pub const MESSAGING_MESSAGE_SENT: &str = "troth.messaging.message.sent";

    // Moderation events
    pub const MODERATION_REPORT_CREATED: &str = "troth.moderation.report.created";
    pub const MODERATION_SANCTION_ISSUED: &str = "troth.moderation.sanction.issued";
    pub const MODERATION_SANCTION_LIFTED: &str = "troth.moderation.sanction.lifted";
    pub const MODERATION_VERIFICATION_REVIEWED: &str = "troth.moderation.verification.reviewed";
}

/// Common event data payloads
pub mod payloads {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    use crate::types::account::{AccountStatus, BanTerm, VerificationFlags, VerificationKind};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct UserRegistered {
        pub user_id: Uuid,
        pub email: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct AccountStatusChanged {
        pub user_id: Uuid,
        pub account_status: AccountStatus,
        pub trust_score: i32,
        pub flags: VerificationFlags,
        pub ban_until: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct InterestSent {
        pub interest_id: Uuid,
        pub sender_id: Uuid,
        pub receiver_id: Uuid,
        pub sender_display_name: String,
        pub message: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct InterestResponded {
        pub interest_id: Uuid,
        pub sender_id: Uuid,
        pub receiver_id: Uuid,
        pub receiver_display_name: String,
        pub accepted: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchCreated {
        pub match_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
        pub source: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MatchRemoved {
        pub match_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
        pub removed_by: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProposalSent {
        pub proposal_id: Uuid,
        pub match_id: Uuid,
        pub proposer_id: Uuid,
        pub recipient_id: Uuid,
        pub proposer_display_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ProposalAnswered {
        pub proposal_id: Uuid,
        pub match_id: Uuid,
        pub proposer_id: Uuid,
        pub recipient_id: Uuid,
        pub recipient_display_name: String,
        pub answer: String,
    }

    impl ProposalAnswered {
        pub fn is_yes(&self) -> bool {
            self.answer == "YES"
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct MessageSent {
        pub message_id: Uuid,
        pub conversation_id: Uuid,
        pub match_id: Uuid,
        pub sender_id: Uuid,
        pub recipient_ids: Vec<Uuid>,
        pub content_preview: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ReportCreated {
        pub report_id: Uuid,
        pub reporter_id: Uuid,
        pub reported_id: Uuid,
        pub report_type: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SanctionIssued {
        pub sanction_id: Uuid,
        pub user_id: Uuid,
        pub sanction_type: String,
        pub reason: String,
        pub expires_at: Option<DateTime<Utc>>,
    }

    impl SanctionIssued {
        /// Warnings are recorded but do not restrict the account.
        pub fn is_ban(&self) -> bool {
            self.sanction_type.starts_with("ban_")
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SanctionLifted {
        pub sanction_id: Uuid,
        pub user_id: Uuid,
        /// Longest ban still in force for the user after this lift
        #[serde(default)]
        pub remaining_ban: Option<BanTerm>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct VerificationReviewed {
        pub verification_id: Uuid,
        pub user_id: Uuid,
        pub document_type: VerificationKind,
        pub approved: bool,
        pub reviewed_by: Uuid,
        pub notes: Option<String>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::account::{BanTerm, VerificationKind};

    #[test]
    fn envelope_round_trips_payload() {
        let user_id = Uuid::now_v7();
        let event = Event::new(
            "troth-moderation",
            routing_keys::MODERATION_VERIFICATION_REVIEWED,
            payloads::VerificationReviewed {
                verification_id: Uuid::now_v7(),
                user_id,
                document_type: VerificationKind::Id,
                approved: true,
                reviewed_by: Uuid::now_v7(),
                notes: None,
            },
        )
        .with_user(user_id);

        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded: Event<payloads::VerificationReviewed> = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(decoded.user_id, Some(user_id));
        assert_eq!(decoded.event_type, routing_keys::MODERATION_VERIFICATION_REVIEWED);
        assert_eq!(decoded.data.document_type, VerificationKind::Id);
        assert!(decoded.data.approved);
    }

    #[test]
    fn document_type_is_uppercase_on_the_wire() {
        let value = serde_json::to_value(VerificationKind::Photo).unwrap();
        assert_eq!(value, "PHOTO");
    }

    #[test]
    fn only_ban_sanctions_restrict() {
        let mut sanction = payloads::SanctionIssued {
            sanction_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            sanction_type: "warning".into(),
            reason: "spam".into(),
            expires_at: None,
        };
        assert!(!sanction.is_ban());
        sanction.sanction_type = "ban_24h".into();
        assert!(sanction.is_ban());
    }

    #[test]
    fn lift_without_remaining_ban_field_still_decodes() {
        let json = serde_json::json!({ "sanction_id": Uuid::now_v7(), "user_id": Uuid::now_v7() });
        let lifted: payloads::SanctionLifted = serde_json::from_value(json).unwrap();
        assert!(lifted.remaining_ban.is_none());

        let permanent = payloads::SanctionLifted { remaining_ban: Some(BanTerm::Permanent), ..lifted };
        let value = serde_json::to_value(&permanent).unwrap();
        assert_eq!(value["remaining_ban"]["kind"], "permanent");
    }
}
