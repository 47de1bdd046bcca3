use std::sync::Arc;

use diesel::prelude::*;

use troth_shared::clients::db::get_conn;
use troth_shared::clients::rabbitmq::{consume, decode_event};
use troth_shared::types::event::{routing_keys, payloads};

use crate::models::NewProposalAlert;
use crate::schema::proposal_alerts;
use crate::AppState;

/// Queue a staff follow-up whenever a proposal is answered YES
pub async fn listen_proposal_answered(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state.rabbitmq.subscribe(
        "troth-moderation.user.proposal.answered",
        &[routing_keys::USER_PROPOSAL_ANSWERED],
    ).await?;

    tracing::info!("listening for user.proposal.answered events");

    consume(consumer, |routing_key, data| {
        let state = state.clone();
        async move {
            let Some(event) = decode_event::<payloads::ProposalAnswered>(&routing_key, &data) else {
                return;
            };
            if let Err(e) = record_alert(&state, &event.data) {
                tracing::error!(error = %e, proposal_id = %event.data.proposal_id, "failed to record proposal alert");
            }
        }
    })
    .await;

    Ok(())
}

fn record_alert(state: &AppState, data: &payloads::ProposalAnswered) -> anyhow::Result<()> {
    if !data.is_yes() {
        tracing::debug!(proposal_id = %data.proposal_id, answer = %data.answer, "proposal not accepted, no alert");
        return Ok(());
    }

    let mut conn = get_conn(&state.db)?;
    // Redelivered events hit the unique proposal id and insert nothing
    let inserted = diesel::insert_into(proposal_alerts::table)
        .values(&NewProposalAlert {
            proposal_id: data.proposal_id,
            match_id: data.match_id,
            proposer_id: data.proposer_id,
            recipient_id: data.recipient_id,
        })
        .on_conflict(proposal_alerts::proposal_id)
        .do_nothing()
        .execute(&mut conn)?;

    if inserted > 0 {
        tracing::info!(proposal_id = %data.proposal_id, match_id = %data.match_id, "proposal alert recorded");
    }
    Ok(())
}
