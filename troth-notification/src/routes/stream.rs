// GET /notifications/stream
//
// Server-Sent Events for the signed-in user. Browsers open it with
// EventSource, which cannot set headers, so the access token may come as
// `?access_token=`.
//
// Frames:
//   event: unread        data: {"unread": <count>}              (first frame)
//   event: notification  id: <uuid>  data: <notification json>
//   event: resync        data: {"skipped": n, "unread": <count>} (after lag)

use axum::extract::State;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use troth_shared::errors::AppResult;
use troth_shared::types::auth::AuthUser;

use crate::models::Notification;
use crate::services::notification_service;
use crate::AppState;

const KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, Serialize)]
struct UnreadFrame {
    unread: i64,
}

#[derive(Debug, Serialize)]
struct ResyncFrame {
    skipped: u64,
    unread: Option<i64>,
}

fn is_for(user_id: Uuid, notification: &Notification) -> bool {
    notification.user_id == user_id
}

fn frame<T: Serialize>(name: &str, payload: &T) -> Option<SseEvent> {
    match serde_json::to_string(payload) {
        Ok(json) => Some(SseEvent::default().event(name).data(json)),
        Err(e) => {
            tracing::warn!(error = %e, event = %name, "failed to serialize stream frame");
            None
        }
    }
}

pub async fn stream_notifications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    // Subscribe before counting so nothing created in between is missed
    let mut rx = state.hub.subscribe();
    let unread = notification_service::count_unread(&state.db, user.id)?;
    let user_id = user.id;

    tracing::info!(user_id = %user_id, unread, "notification stream opened");

    let stream = async_stream::stream! {
        if let Some(first) = frame("unread", &UnreadFrame { unread }) {
            yield Ok(first);
        }

        loop {
            match rx.recv().await {
                Ok(notification) => {
                    if !is_for(user_id, &notification) {
                        continue;
                    }
                    if let Some(event) = frame("notification", notification.as_ref()) {
                        yield Ok(event.id(notification.id.to_string()));
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "notification stream lagged");
                    let unread = notification_service::count_unread(&state.db, user_id).ok();
                    if let Some(event) = frame("resync", &ResyncFrame { skipped, unread }) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Closed) => {
                    tracing::info!(user_id = %user_id, "notification hub closed, ending stream");
                    break;
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("keep-alive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn notification_for(user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id,
            notification_type: "new_message".into(),
            title: "New message".into(),
            body: "hi".into(),
            link: Some("/conversations/x".into()),
            data: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stream_only_carries_own_notifications() {
        let me = Uuid::now_v7();
        assert!(is_for(me, &notification_for(me)));
        assert!(!is_for(me, &notification_for(Uuid::now_v7())));
    }

    #[test]
    fn resync_frame_shape() {
        let json = serde_json::to_value(ResyncFrame { skipped: 3, unread: Some(7) }).unwrap();
        assert_eq!(json, serde_json::json!({ "skipped": 3, "unread": 7 }));
    }
}
