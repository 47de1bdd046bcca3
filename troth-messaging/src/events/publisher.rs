use uuid::Uuid;

use troth_shared::clients::rabbitmq::RabbitMQClient;
use troth_shared::types::event::{routing_keys, payloads, Event};

use crate::models::{self, Conversation, Message};

pub async fn publish_message_sent(
    rabbitmq: &RabbitMQClient,
    conversation: &Conversation,
    message: &Message,
    recipient_ids: Vec<Uuid>,
) {
    let event = Event::new(
        "troth-messaging",
        routing_keys::MESSAGING_MESSAGE_SENT,
        payloads::MessageSent {
            message_id: message.id,
            conversation_id: conversation.id,
            match_id: conversation.match_id,
            sender_id: message.sender_id,
            recipient_ids,
            content_preview: models::preview(&message.content),
        },
    )
    .with_user(message.sender_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MESSAGING_MESSAGE_SENT, &event).await {
        tracing::error!(error = %e, "failed to publish message.sent event");
    }
}
