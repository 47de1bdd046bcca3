use std::sync::Arc;

use troth_shared::clients::db::get_conn;
use troth_shared::clients::rabbitmq::{consume, decode_event};
use troth_shared::types::event::{payloads, routing_keys};

use crate::events::publisher;
use crate::services::account_service;
use crate::AppState;

/// Applies reviewed verifications to the account and notifies the user by email.
pub async fn listen_verification_reviewed(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state.rabbitmq.subscribe(
        "troth-auth.verification.reviewed",
        &[routing_keys::MODERATION_VERIFICATION_REVIEWED],
    ).await?;

    tracing::info!("listening for verification.reviewed events");

    consume(consumer, |routing_key, data| {
        let state = state.clone();
        async move {
            let Some(event) = decode_event::<payloads::VerificationReviewed>(&routing_key, &data) else {
                return;
            };
            if let Err(e) = handle_verification_reviewed(&state, event.data).await {
                tracing::error!(error = %e, "failed to handle verification.reviewed");
            }
        }
    })
    .await;

    Ok(())
}

async fn handle_verification_reviewed(
    state: &AppState,
    data: payloads::VerificationReviewed,
) -> anyhow::Result<()> {
    let mut conn = get_conn(&state.db)?;

    let (user, headline, body) = if data.approved {
        let (user, update) =
            account_service::process_verification(&mut conn, data.user_id, data.document_type)?;
        if update.changed {
            publisher::publish_status_changed(&state.rabbitmq, &user).await;
        }
        let body = format!(
            "Your {} verification was approved. Your trust score is now {}.",
            data.document_type.label(),
            user.trust_score
        );
        (user, "Verification approved", body)
    } else {
        let user = account_service::find_user(&mut conn, data.user_id)?;
        let body = match &data.notes {
            Some(notes) => format!(
                "Your {} verification was not approved: {notes}",
                data.document_type.label()
            ),
            None => format!("Your {} verification was not approved.", data.document_type.label()),
        };
        (user, "Verification update", body)
    };

    if let Err(e) = state.email.send_account_notice(&user.email, headline, &body).await {
        tracing::warn!(error = %e, user_id = %user.id, "failed to send verification notice");
    }
    Ok(())
}

/// Mirrors moderation bans onto the account.
pub async fn listen_sanctions(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state.rabbitmq.subscribe(
        "troth-auth.sanctions",
        &[routing_keys::MODERATION_SANCTION_ISSUED, routing_keys::MODERATION_SANCTION_LIFTED],
    ).await?;

    tracing::info!("listening for sanction events");

    consume(consumer, |routing_key, data| {
        let state = state.clone();
        async move {
            let result = match routing_key.as_str() {
                routing_keys::MODERATION_SANCTION_ISSUED => {
                    match decode_event::<payloads::SanctionIssued>(&routing_key, &data) {
                        Some(event) => handle_sanction_issued(&state, event.data).await,
                        None => Ok(()),
                    }
                }
                routing_keys::MODERATION_SANCTION_LIFTED => {
                    match decode_event::<payloads::SanctionLifted>(&routing_key, &data) {
                        Some(event) => handle_sanction_lifted(&state, event.data).await,
                        None => Ok(()),
                    }
                }
                other => {
                    tracing::warn!(routing_key = %other, "unexpected routing key");
                    Ok(())
                }
            };
            if let Err(e) = result {
                tracing::error!(error = %e, routing_key = %routing_key, "failed to handle sanction event");
            }
        }
    })
    .await;

    Ok(())
}

async fn handle_sanction_issued(state: &AppState, data: payloads::SanctionIssued) -> anyhow::Result<()> {
    if !data.is_ban() {
        tracing::debug!(user_id = %data.user_id, sanction_type = %data.sanction_type, "non-ban sanction ignored");
        return Ok(());
    }
    let mut conn = get_conn(&state.db)?;
    let user = account_service::apply_ban(&mut conn, data.user_id, data.expires_at)?;
    publisher::publish_status_changed(&state.rabbitmq, &user).await;
    Ok(())
}

async fn handle_sanction_lifted(state: &AppState, data: payloads::SanctionLifted) -> anyhow::Result<()> {
    let mut conn = get_conn(&state.db)?;
    if let Some(user) = account_service::lift_ban(&mut conn, data.user_id, data.remaining_ban)? {
        tracing::info!(user_id = %user.id, account_status = %user.account_status, ban_until = ?user.ban_until, "ban lifted");
        publisher::publish_status_changed(&state.rabbitmq, &user).await;
    }
    Ok(())
}
