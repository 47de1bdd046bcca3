use std::sync::Arc;

use troth_shared::clients::db::get_conn;
use troth_shared::clients::rabbitmq::{consume, decode_event};
use troth_shared::types::event::{routing_keys, payloads};

use crate::services::conversation_service;
use crate::AppState;

/// Open a conversation when a match forms and close it when the match goes away
pub async fn listen_match_events(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state.rabbitmq.subscribe(
        "troth-messaging.user.match",
        &[routing_keys::USER_MATCH_CREATED, routing_keys::USER_MATCH_REMOVED],
    ).await?;

    tracing::info!("listening for match events");

    consume(consumer, |routing_key, data| {
        let state = state.clone();
        async move {
            let result = match routing_key.as_str() {
                routing_keys::USER_MATCH_CREATED => {
                    match decode_event::<payloads::MatchCreated>(&routing_key, &data) {
                        Some(event) => handle_match_created(&state, event.data),
                        None => Ok(()),
                    }
                }
                routing_keys::USER_MATCH_REMOVED => {
                    match decode_event::<payloads::MatchRemoved>(&routing_key, &data) {
                        Some(event) => handle_match_removed(&state, event.data),
                        None => Ok(()),
                    }
                }
                other => {
                    tracing::warn!(routing_key = %other, "unexpected routing key");
                    Ok(())
                }
            };
            if let Err(e) = result {
                tracing::error!(error = %e, routing_key = %routing_key, "failed to handle match event");
            }
        }
    })
    .await;

    Ok(())
}

fn handle_match_created(state: &AppState, data: payloads::MatchCreated) -> anyhow::Result<()> {
    let mut conn = get_conn(&state.db)?;
    let (conversation, created) =
        conversation_service::open_for_match(&mut conn, data.match_id, data.user_a_id, data.user_b_id)?;

    if created {
        tracing::info!(
            conversation_id = %conversation.id,
            match_id = %data.match_id,
            "conversation opened for match"
        );
    } else {
        tracing::debug!(match_id = %data.match_id, "conversation already exists for match");
    }
    Ok(())
}

fn handle_match_removed(state: &AppState, data: payloads::MatchRemoved) -> anyhow::Result<()> {
    let mut conn = get_conn(&state.db)?;
    match conversation_service::close_for_match(&mut conn, data.match_id)? {
        Some(conversation) => tracing::info!(
            conversation_id = %conversation.id,
            match_id = %data.match_id,
            removed_by = %data.removed_by,
            "conversation closed"
        ),
        None => tracing::debug!(match_id = %data.match_id, "no open conversation for removed match"),
    }
    Ok(())
}
