use std::sync::Arc;

use troth_shared::clients::db::get_conn;
use troth_shared::clients::rabbitmq::{consume, decode_event};
use troth_shared::types::event::{routing_keys, payloads};

use crate::services::profile_service;
use crate::AppState;

/// Listen for auth.user.registered events to create default profiles
pub async fn listen_user_registered(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state.rabbitmq.subscribe(
        "troth-user.auth.user.registered",
        &[routing_keys::AUTH_USER_REGISTERED],
    ).await?;

    tracing::info!("listening for auth.user.registered events");

    consume(consumer, |routing_key, data| {
        let state = state.clone();
        async move {
            let Some(event) = decode_event::<payloads::UserRegistered>(&routing_key, &data) else {
                return;
            };
            let user_id = event.data.user_id;
            let result = get_conn(&state.db).and_then(|mut conn| {
                profile_service::create_default_profile(&mut conn, user_id, &event.data.email)
            });
            if let Err(e) = result {
                tracing::error!(error = %e, user_id = %user_id, "failed to create default profile");
            }
        }
    })
    .await;

    Ok(())
}

/// Mirror account status and trust score onto the profile
pub async fn listen_status_changed(state: Arc<AppState>) -> anyhow::Result<()> {
    let consumer = state.rabbitmq.subscribe(
        "troth-user.auth.user.status_changed",
        &[routing_keys::AUTH_USER_STATUS_CHANGED],
    ).await?;

    tracing::info!("listening for auth.user.status_changed events");

    consume(consumer, |routing_key, data| {
        let state = state.clone();
        async move {
            let Some(event) = decode_event::<payloads::AccountStatusChanged>(&routing_key, &data) else {
                return;
            };
            let result = get_conn(&state.db)
                .and_then(|mut conn| profile_service::mirror_account(&mut conn, &event.data));
            match result {
                Ok(0) => tracing::warn!(user_id = %event.data.user_id, "status change for unknown profile"),
                Ok(_) => tracing::info!(
                    user_id = %event.data.user_id,
                    account_status = %event.data.account_status,
                    trust_score = event.data.trust_score,
                    "account status mirrored"
                ),
                Err(e) => tracing::error!(error = %e, user_id = %event.data.user_id, "failed to mirror account status"),
            }
        }
    })
    .await;

    Ok(())
}
