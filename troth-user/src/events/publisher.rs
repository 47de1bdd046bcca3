use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::types::event::{routing_keys, payloads, Event};

use crate::models::{Interest, Match, Proposal};

const SOURCE: &str = "troth-user";

pub async fn publish_interest_sent(rabbitmq: &RabbitMQClient, interest: &Interest, sender_display_name: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_INTEREST_SENT,
        payloads::InterestSent {
            interest_id: interest.id,
            sender_id: interest.sender_id,
            receiver_id: interest.receiver_id,
            sender_display_name: sender_display_name.to_string(),
            message: interest.message.clone(),
        },
    )
    .with_user(interest.sender_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_INTEREST_SENT, &event).await {
        tracing::error!(error = %e, "failed to publish interest.sent event");
    }
}

pub async fn publish_interest_responded(
    rabbitmq: &RabbitMQClient,
    interest: &Interest,
    receiver_display_name: &str,
    accepted: bool,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_INTEREST_RESPONDED,
        payloads::InterestResponded {
            interest_id: interest.id,
            sender_id: interest.sender_id,
            receiver_id: interest.receiver_id,
            receiver_display_name: receiver_display_name.to_string(),
            accepted,
        },
    )
    .with_user(interest.receiver_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_INTEREST_RESPONDED, &event).await {
        tracing::error!(error = %e, "failed to publish interest.responded event");
    }
}

pub async fn publish_match_created(rabbitmq: &RabbitMQClient, created: &Match) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_MATCH_CREATED,
        payloads::MatchCreated {
            match_id: created.id,
            user_a_id: created.user_a_id,
            user_b_id: created.user_b_id,
            source: created.source.clone(),
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::USER_MATCH_CREATED, &event).await {
        tracing::error!(error = %e, match_id = %created.id, "failed to publish match.created event");
    }
}

pub async fn publish_match_removed(rabbitmq: &RabbitMQClient, removed: &Match, removed_by: uuid::Uuid) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_MATCH_REMOVED,
        payloads::MatchRemoved {
            match_id: removed.id,
            user_a_id: removed.user_a_id,
            user_b_id: removed.user_b_id,
            removed_by,
        },
    )
    .with_user(removed_by);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_MATCH_REMOVED, &event).await {
        tracing::error!(error = %e, match_id = %removed.id, "failed to publish match.removed event");
    }
}

pub async fn publish_proposal_sent(rabbitmq: &RabbitMQClient, proposal: &Proposal, proposer_display_name: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_PROPOSAL_SENT,
        payloads::ProposalSent {
            proposal_id: proposal.id,
            match_id: proposal.match_id,
            proposer_id: proposal.proposer_id,
            recipient_id: proposal.recipient_id,
            proposer_display_name: proposer_display_name.to_string(),
        },
    )
    .with_user(proposal.proposer_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_PROPOSAL_SENT, &event).await {
        tracing::error!(error = %e, "failed to publish proposal.sent event");
    }
}

/// Returns whether the event reached the broker.
pub async fn publish_proposal_answered(
    rabbitmq: &RabbitMQClient,
    proposal: &Proposal,
    recipient_display_name: &str,
) -> bool {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_PROPOSAL_ANSWERED,
        payloads::ProposalAnswered {
            proposal_id: proposal.id,
            match_id: proposal.match_id,
            proposer_id: proposal.proposer_id,
            recipient_id: proposal.recipient_id,
            recipient_display_name: recipient_display_name.to_string(),
            answer: proposal.answer.clone(),
        },
    )
    .with_user(proposal.recipient_id);

    match rabbitmq.publish(routing_keys::USER_PROPOSAL_ANSWERED, &event).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, proposal_id = %proposal.id, "failed to publish proposal.answered event");
            false
        }
    }
}
