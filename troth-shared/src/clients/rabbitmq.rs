use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    Consumer, ExchangeKind,
};
use futures_lite::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

use crate::types::Event;

/// Durable topic exchange every service publishes to.
pub const EXCHANGE_NAME: &str = "troth.events";

/// Unacked deliveries a single consumer may hold.
const PREFETCH: u16 = 32;

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Clone)]
pub struct RabbitMQClient {
    channel: Channel,
}

impl RabbitMQClient {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let conn = Connection::connect(url, ConnectionProperties::default()).await?;
        let channel = conn.create_channel().await?;

        channel
            .exchange_declare(
                EXCHANGE_NAME,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        channel.basic_qos(PREFETCH, BasicQosOptions::default()).await?;

        tracing::info!(exchange = EXCHANGE_NAME, "connected to RabbitMQ");
        Ok(Self { channel })
    }

    /// Publish a persistent event. The envelope id doubles as the AMQP
    /// message id so consumers can spot redeliveries.
    pub async fn publish<T: Serialize>(&self, routing_key: &str, event: &Event<T>) -> Result<(), BusError> {
        let payload = serde_json::to_vec(event)?;
        let properties = BasicProperties::default()
            .with_content_type("application/json".into())
            .with_message_id(event.id.to_string().into())
            .with_timestamp(event.timestamp.timestamp().max(0) as u64)
            .with_app_id(event.source.clone().into())
            .with_delivery_mode(2);

        self.channel
            .basic_publish(EXCHANGE_NAME, routing_key, BasicPublishOptions::default(), &payload, properties)
            .await?
            .await?;

        tracing::debug!(routing_key = %routing_key, event_id = %event.id, "event published");
        Ok(())
    }

    /// Declare a durable queue owned by one service, bind it to the given
    /// routing keys and start consuming.
    pub async fn subscribe(&self, queue_name: &str, routing_keys: &[&str]) -> Result<Consumer, BusError> {
        self.channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;

        for key in routing_keys {
            self.channel
                .queue_bind(queue_name, EXCHANGE_NAME, key, QueueBindOptions::default(), FieldTable::default())
                .await?;
        }

        let consumer = self
            .channel
            .basic_consume(
                queue_name,
                &format!("{queue_name}-consumer"),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        tracing::info!(queue = %queue_name, bindings = ?routing_keys, "subscribed to queue");
        Ok(consumer)
    }
}

/// Drive a consumer until the channel closes, acking every delivery after
/// the handler ran. Handlers log their own failures; a poison message is
/// acked rather than redelivered forever.
pub async fn consume<F, Fut>(mut consumer: Consumer, mut handler: F)
where
    F: FnMut(String, Vec<u8>) -> Fut,
    Fut: Future<Output = ()>,
{
    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                handler(delivery.routing_key.to_string(), delivery.data.clone()).await;
                if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
                    tracing::warn!(error = %e, "failed to ack delivery");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "consumer error");
            }
        }
    }
}

/// Decode an event envelope, logging instead of failing on bad payloads.
pub fn decode_event<T>(routing_key: &str, data: &[u8]) -> Option<Event<T>>
where
    T: Serialize + DeserializeOwned,
{
    match serde_json::from_slice::<Event<T>>(data) {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::error!(error = %e, routing_key = %routing_key, "failed to deserialize event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::event::payloads::SanctionLifted;
    use uuid::Uuid;

    #[test]
    fn decode_accepts_valid_envelope() {
        let event = Event::new(
            "troth-moderation",
            "troth.moderation.sanction.lifted",
            SanctionLifted { sanction_id: Uuid::now_v7(), user_id: Uuid::now_v7(), remaining_ban: None },
        );
        let bytes = serde_json::to_vec(&event).unwrap();
        let decoded = decode_event::<SanctionLifted>("troth.moderation.sanction.lifted", &bytes);
        assert_eq!(decoded.map(|e| e.id), Some(event.id));
    }

    #[test]
    fn decode_rejects_wrong_payload() {
        let bytes = br#"{"not":"an envelope"}"#;
        assert!(decode_event::<SanctionLifted>("x", bytes).is_none());
    }
}
