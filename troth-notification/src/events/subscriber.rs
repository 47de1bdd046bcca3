use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use troth_shared::clients::rabbitmq::{consume, decode_event};
use troth_shared::types::event::routing_keys;

use crate::models::NewNotification;
use crate::services::notification_service;
use crate::templates;
use crate::AppState;

/// Interest, match and proposal activity from the user service.
pub async fn listen_relationship_events(state: Arc<AppState>) -> anyhow::Result<()> {
    listen(
        state,
        "troth-notification.relationship",
        &[
            routing_keys::USER_INTEREST_SENT,
            routing_keys::USER_INTEREST_RESPONDED,
            routing_keys::USER_MATCH_CREATED,
            routing_keys::USER_PROPOSAL_SENT,
            routing_keys::USER_PROPOSAL_ANSWERED,
        ],
    )
    .await
}

pub async fn listen_message_events(state: Arc<AppState>) -> anyhow::Result<()> {
    listen(state, "troth-notification.message", &[routing_keys::MESSAGING_MESSAGE_SENT]).await
}

/// Verification outcomes and sanctions.
pub async fn listen_moderation_events(state: Arc<AppState>) -> anyhow::Result<()> {
    listen(
        state,
        "troth-notification.moderation",
        &[
            routing_keys::MODERATION_VERIFICATION_REVIEWED,
            routing_keys::MODERATION_SANCTION_ISSUED,
            routing_keys::MODERATION_SANCTION_LIFTED,
        ],
    )
    .await
}

async fn listen(state: Arc<AppState>, queue: &str, keys: &[&str]) -> anyhow::Result<()> {
    let consumer = state.rabbitmq.subscribe(queue, keys).await?;

    tracing::info!(queue = %queue, "listening for notification events");

    consume(consumer, |routing_key, data| {
        let state = state.clone();
        async move {
            let drafts = drafts_for(&routing_key, &data);
            deliver(&state, &routing_key, &drafts);
        }
    })
    .await;

    Ok(())
}

fn render<T, F>(routing_key: &str, data: &[u8], template: F) -> Vec<NewNotification>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&T) -> Vec<NewNotification>,
{
    decode_event::<T>(routing_key, data)
        .map(|event| template(&event.data))
        .unwrap_or_default()
}

fn drafts_for(routing_key: &str, data: &[u8]) -> Vec<NewNotification> {
    match routing_key {
        routing_keys::USER_INTEREST_SENT => render(routing_key, data, templates::interest_sent),
        routing_keys::USER_INTEREST_RESPONDED => render(routing_key, data, templates::interest_responded),
        routing_keys::USER_MATCH_CREATED => render(routing_key, data, templates::match_created),
        routing_keys::USER_PROPOSAL_SENT => render(routing_key, data, templates::proposal_sent),
        routing_keys::USER_PROPOSAL_ANSWERED => render(routing_key, data, templates::proposal_answered),
        routing_keys::MESSAGING_MESSAGE_SENT => render(routing_key, data, templates::message_sent),
        routing_keys::MODERATION_VERIFICATION_REVIEWED => {
            render(routing_key, data, templates::verification_reviewed)
        }
        routing_keys::MODERATION_SANCTION_ISSUED => render(routing_key, data, templates::sanction_issued),
        routing_keys::MODERATION_SANCTION_LIFTED => render(routing_key, data, templates::sanction_lifted),
        other => {
            tracing::warn!(routing_key = %other, "unexpected routing key");
            Vec::new()
        }
    }
}

/// Store the rows, then push them to any open streams.
fn deliver(state: &AppState, routing_key: &str, drafts: &[NewNotification]) {
    match notification_service::create_notifications(&state.db, drafts) {
        Ok(created) => {
            for notification in created {
                state.hub.emit(notification);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, routing_key = %routing_key, "failed to store notifications");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use troth_shared::types::event::{payloads, Event};
    use uuid::Uuid;

    #[test]
    fn routes_event_to_its_template() {
        let receiver = Uuid::now_v7();
        let event = Event::new(
            "troth-user",
            routing_keys::USER_INTEREST_SENT,
            payloads::InterestSent {
                interest_id: Uuid::now_v7(),
                sender_id: Uuid::now_v7(),
                receiver_id: receiver,
                sender_display_name: "Amina".into(),
                message: Some("salaam".into()),
            },
        );
        let bytes = serde_json::to_vec(&event).unwrap();

        let drafts = drafts_for(routing_keys::USER_INTEREST_SENT, &bytes);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].user_id, receiver);
    }

    #[test]
    fn malformed_payload_yields_nothing() {
        assert!(drafts_for(routing_keys::USER_MATCH_CREATED, b"{}").is_empty());
    }

    #[test]
    fn unknown_key_yields_nothing() {
        assert!(drafts_for("troth.unknown.thing", b"{}").is_empty());
    }
}
