use std::sync::Arc;

use tokio::sync::broadcast;

use crate::models::Notification;

/// In-process fan-out of freshly stored notifications to open streams.
///
/// Every stream receives every notification and keeps only its own user's;
/// a stream that falls more than the channel capacity behind gets
/// `RecvError::Lagged` and must resync from the database.
#[derive(Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<Arc<Notification>>,
}

impl NotificationHub {
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many streams were listening. Zero is normal.
    pub fn emit(&self, notification: Notification) -> usize {
        self.tx.send(Arc::new(notification)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Notification>> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn notification(user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::now_v7(),
            user_id,
            notification_type: "match_created".into(),
            title: "It's a match!".into(),
            body: "".into(),
            link: None,
            data: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn every_subscriber_gets_a_copy() {
        let hub = NotificationHub::with_capacity(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let sent = notification(Uuid::now_v7());
        assert_eq!(hub.emit(sent.clone()), 2);

        assert_eq!(first.recv().await.unwrap().id, sent.id);
        assert_eq!(second.recv().await.unwrap().id, sent.id);
    }

    #[test]
    fn emitting_without_listeners_is_fine() {
        let hub = NotificationHub::with_capacity(8);
        assert_eq!(hub.emit(notification(Uuid::now_v7())), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let hub = NotificationHub::with_capacity(2);
        let mut rx = hub.subscribe();
        for _ in 0..3 {
            hub.emit(notification(Uuid::now_v7()));
        }
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(1))));
    }
}
