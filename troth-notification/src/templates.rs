//! Turns domain events into the notification rows each recipient sees.

use serde_json::json;
use uuid::Uuid;

use troth_shared::types::account::BanTerm;
use troth_shared::types::event::payloads;

use crate::models::NewNotification;

fn draft(
    user_id: Uuid,
    notification_type: &str,
    title: impl Into<String>,
    body: impl Into<String>,
    link: impl Into<String>,
    data: serde_json::Value,
) -> NewNotification {
    NewNotification {
        user_id,
        notification_type: notification_type.to_string(),
        title: title.into(),
        body: body.into(),
        link: Some(link.into()),
        data: Some(data),
    }
}

pub fn interest_sent(data: &payloads::InterestSent) -> Vec<NewNotification> {
    vec![draft(
        data.receiver_id,
        "interest_received",
        "New interest",
        format!("{} is interested in you", data.sender_display_name),
        "/interests/received",
        json!({ "interest_id": data.interest_id, "sender_id": data.sender_id }),
    )]
}

pub fn interest_responded(data: &payloads::InterestResponded) -> Vec<NewNotification> {
    let ids = json!({ "interest_id": data.interest_id, "receiver_id": data.receiver_id });
    let notification = if data.accepted {
        draft(
            data.sender_id,
            "interest_accepted",
            "Interest accepted",
            format!("{} accepted your interest", data.receiver_display_name),
            "/matches",
            ids,
        )
    } else {
        draft(
            data.sender_id,
            "interest_declined",
            "Interest declined",
            format!("{} declined your interest", data.receiver_display_name),
            "/interests/sent",
            ids,
        )
    };
    vec![notification]
}

/// Both members hear about a new match.
pub fn match_created(data: &payloads::MatchCreated) -> Vec<NewNotification> {
    [(data.user_a_id, data.user_b_id), (data.user_b_id, data.user_a_id)]
        .into_iter()
        .map(|(user_id, partner_id)| {
            draft(
                user_id,
                "match_created",
                "It's a match!",
                "You have a new match. Start a conversation.",
                "/matches",
                json!({ "match_id": data.match_id, "partner_id": partner_id }),
            )
        })
        .collect()
}

pub fn proposal_sent(data: &payloads::ProposalSent) -> Vec<NewNotification> {
    vec![draft(
        data.recipient_id,
        "proposal_received",
        "New proposal",
        format!("{} sent you a proposal", data.proposer_display_name),
        "/proposals",
        json!({ "proposal_id": data.proposal_id, "match_id": data.match_id }),
    )]
}

pub fn proposal_answered(data: &payloads::ProposalAnswered) -> Vec<NewNotification> {
    let (title, body) = if data.is_yes() {
        ("Proposal accepted", format!("{} said yes to your proposal", data.recipient_display_name))
    } else {
        ("Proposal declined", format!("{} said no to your proposal", data.recipient_display_name))
    };
    vec![draft(
        data.proposer_id,
        "proposal_answered",
        title,
        body,
        "/proposals",
        json!({ "proposal_id": data.proposal_id, "answer": data.answer }),
    )]
}

pub fn message_sent(data: &payloads::MessageSent) -> Vec<NewNotification> {
    data.recipient_ids
        .iter()
        .filter(|id| **id != data.sender_id)
        .map(|recipient_id| {
            draft(
                *recipient_id,
                "new_message",
                "New message",
                data.content_preview.clone(),
                format!("/conversations/{}", data.conversation_id),
                json!({
                    "conversation_id": data.conversation_id,
                    "message_id": data.message_id,
                    "sender_id": data.sender_id,
                }),
            )
        })
        .collect()
}

pub fn verification_reviewed(data: &payloads::VerificationReviewed) -> Vec<NewNotification> {
    let label = data.document_type.label();
    let (kind, title, mut body) = if data.approved {
        (
            "verification_approved",
            "Verification approved",
            format!("Your {label} verification was approved"),
        )
    } else {
        (
            "verification_rejected",
            "Verification rejected",
            format!("Your {label} verification was not approved"),
        )
    };
    if let Some(notes) = data.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        body.push_str(&format!(": {}", notes.trim()));
    }
    vec![draft(
        data.user_id,
        kind,
        title,
        body,
        "/verifications",
        json!({ "verification_id": data.verification_id, "document_type": data.document_type }),
    )]
}

pub fn sanction_issued(data: &payloads::SanctionIssued) -> Vec<NewNotification> {
    let (kind, title, body) = if !data.is_ban() {
        ("account_warning", "Account warning", format!("You received a warning: {}", data.reason))
    } else {
        let until = match data.expires_at {
            Some(at) => format!("until {}", at.format("%Y-%m-%d %H:%M UTC")),
            None => "permanently".to_string(),
        };
        ("account_banned", "Account suspended", format!("Your account is suspended {until}: {}", data.reason))
    };
    vec![draft(
        data.user_id,
        kind,
        title,
        body,
        "/account",
        json!({ "sanction_id": data.sanction_id, "sanction_type": data.sanction_type }),
    )]
}

pub fn sanction_lifted(data: &payloads::SanctionLifted) -> Vec<NewNotification> {
    let body = match data.remaining_ban {
        None => "Your account restriction has been lifted".to_string(),
        Some(BanTerm::Permanent) => "One restriction was lifted, your account remains suspended permanently".to_string(),
        Some(BanTerm::Until(at)) => format!(
            "One restriction was lifted, your account remains suspended until {}",
            at.format("%Y-%m-%d %H:%M UTC")
        ),
    };
    vec![draft(
        data.user_id,
        "sanction_lifted",
        "Sanction lifted",
        body,
        "/account",
        json!({ "sanction_id": data.sanction_id }),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use troth_shared::types::account::VerificationKind;

    #[test]
    fn interest_goes_to_receiver() {
        let data = payloads::InterestSent {
            interest_id: Uuid::now_v7(),
            sender_id: Uuid::now_v7(),
            receiver_id: Uuid::now_v7(),
            sender_display_name: "Amina".into(),
            message: None,
        };
        let drafts = interest_sent(&data);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].user_id, data.receiver_id);
        assert_eq!(drafts[0].body, "Amina is interested in you");
        assert_eq!(drafts[0].link.as_deref(), Some("/interests/received"));
    }

    #[test]
    fn declined_interest_links_back_to_sent_list() {
        let data = payloads::InterestResponded {
            interest_id: Uuid::now_v7(),
            sender_id: Uuid::now_v7(),
            receiver_id: Uuid::now_v7(),
            receiver_display_name: "Ravi".into(),
            accepted: false,
        };
        let drafts = interest_responded(&data);
        assert_eq!(drafts[0].user_id, data.sender_id);
        assert_eq!(drafts[0].notification_type, "interest_declined");
        assert_eq!(drafts[0].link.as_deref(), Some("/interests/sent"));
    }

    #[test]
    fn match_notifies_both_members() {
        let data = payloads::MatchCreated {
            match_id: Uuid::now_v7(),
            user_a_id: Uuid::from_u128(1),
            user_b_id: Uuid::from_u128(2),
            source: "INTEREST".into(),
        };
        let drafts = match_created(&data);
        let users: Vec<Uuid> = drafts.iter().map(|d| d.user_id).collect();
        assert_eq!(users, vec![data.user_a_id, data.user_b_id]);
        assert_eq!(drafts[0].data.as_ref().unwrap()["partner_id"], json!(data.user_b_id));
    }

    #[test]
    fn proposal_answer_wording() {
        let mut data = payloads::ProposalAnswered {
            proposal_id: Uuid::now_v7(),
            match_id: Uuid::now_v7(),
            proposer_id: Uuid::now_v7(),
            recipient_id: Uuid::now_v7(),
            recipient_display_name: "Sara".into(),
            answer: "YES".into(),
        };
        let yes = proposal_answered(&data);
        assert_eq!(yes[0].user_id, data.proposer_id);
        assert_eq!(yes[0].title, "Proposal accepted");

        data.answer = "NO".into();
        assert_eq!(proposal_answered(&data)[0].title, "Proposal declined");
    }

    #[test]
    fn message_skips_the_sender() {
        let sender = Uuid::from_u128(1);
        let other = Uuid::from_u128(2);
        let data = payloads::MessageSent {
            message_id: Uuid::now_v7(),
            conversation_id: Uuid::from_u128(9),
            match_id: Uuid::now_v7(),
            sender_id: sender,
            recipient_ids: vec![sender, other],
            content_preview: "hello".into(),
        };
        let drafts = message_sent(&data);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].user_id, other);
        assert_eq!(drafts[0].link.as_deref(), Some(format!("/conversations/{}", Uuid::from_u128(9)).as_str()));
    }

    #[test]
    fn rejected_verification_includes_notes() {
        let data = payloads::VerificationReviewed {
            verification_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            document_type: VerificationKind::Id,
            approved: false,
            reviewed_by: Uuid::now_v7(),
            notes: Some(" blurry scan ".into()),
        };
        let drafts = verification_reviewed(&data);
        assert_eq!(drafts[0].notification_type, "verification_rejected");
        assert_eq!(drafts[0].body, "Your identity document verification was not approved: blurry scan");
    }

    #[test]
    fn ban_and_warning_read_differently() {
        let mut data = payloads::SanctionIssued {
            sanction_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            sanction_type: "warning".into(),
            reason: "rude messages".into(),
            expires_at: None,
        };
        assert_eq!(sanction_issued(&data)[0].notification_type, "account_warning");

        data.sanction_type = "ban_24h".into();
        data.expires_at = Some(Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap());
        let ban = sanction_issued(&data);
        assert_eq!(ban[0].notification_type, "account_banned");
        assert!(ban[0].body.contains("until 2026-05-01 12:00 UTC"));

        data.sanction_type = "ban_permanent".into();
        data.expires_at = None;
        assert!(sanction_issued(&data)[0].body.contains("permanently"));
    }

    #[test]
    fn lift_mentions_a_remaining_ban() {
        let mut data = payloads::SanctionLifted {
            sanction_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            remaining_ban: None,
        };
        assert_eq!(sanction_lifted(&data)[0].body, "Your account restriction has been lifted");

        data.remaining_ban = Some(BanTerm::Until(Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap()));
        assert!(sanction_lifted(&data)[0].body.contains("remains suspended until 2026-06-01 08:00 UTC"));
    }
}
