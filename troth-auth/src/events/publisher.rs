use uuid::Uuid;

use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::types::event::{routing_keys, payloads, Event};

use crate::models::User;

const SOURCE: &str = "troth-auth";

pub async fn publish_user_registered(rabbitmq: &RabbitMQClient, user_id: Uuid, email: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::AUTH_USER_REGISTERED,
        payloads::UserRegistered {
            user_id,
            email: email.to_string(),
        },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::AUTH_USER_REGISTERED, &event).await {
        tracing::error!(error = %e, "failed to publish user.registered event");
    }
}

pub async fn publish_status_changed(rabbitmq: &RabbitMQClient, user: &User) {
    let event = Event::new(SOURCE, routing_keys::AUTH_USER_STATUS_CHANGED, user.status_payload())
        .with_user(user.id);

    if let Err(e) = rabbitmq.publish(routing_keys::AUTH_USER_STATUS_CHANGED, &event).await {
        tracing::error!(error = %e, user_id = %user.id, "failed to publish user.status_changed event");
    }
}
