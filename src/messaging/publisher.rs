use async_trait::async_trait;
use std::sync::Arc;

use super::MessageBus;
use crate::domain::ticketing::TicketEvent;
use crate::metrics::Metrics;
use crate::utils::{retry_with_backoff, RetryConfig, RetryResult};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to serialize {event_type}: {source}")]
    Serialize {
        event_type: &'static str,
        source: serde_json::Error,
    },

    #[error("gave up publishing to {topic} after {attempts} attempts: {source}")]
    Exhausted {
        topic: String,
        attempts: u32,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), PublishError>;
}

/// Serialize `event` and publish it under its partition key.
pub async fn publish_event<E: TicketEvent>(
    publisher: &dyn EventPublisher,
    topic: &str,
    event: &E,
) -> Result<(), PublishError> {
    let payload = serde_json::to_string(event).map_err(|source| PublishError::Serialize {
        event_type: E::event_type(),
        source,
    })?;

    publisher.publish(topic, &event.partition_key(), &payload).await
}

/// Bounded retry with exponential backoff over a single-attempt bus.
pub struct RetryingPublisher {
    bus: Arc<dyn MessageBus>,
    retry: RetryConfig,
    metrics: Arc<Metrics>,
}

impl RetryingPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, retry: RetryConfig, metrics: Arc<Metrics>) -> Self {
        Self { bus, retry, metrics }
    }
}

#[async_trait]
impl EventPublisher for RetryingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), PublishError> {
        let result = retry_with_backoff(&self.retry, move |attempt| {
            self.metrics.record_publish_attempt(topic);
            tracing::debug!(topic = %topic, key = %key, attempt, "Publishing event");
            self.bus.send(topic, key, payload)
        })
        .await;

        self.metrics.update_circuit_breaker_state(self.bus.circuit_state().await);

        match result {
            RetryResult::Success { attempts, .. } => {
                self.metrics.record_publish_outcome(topic, true);
                tracing::info!(topic = %topic, key = %key, attempts, "Event published");
                Ok(())
            }
            RetryResult::Exhausted { error, attempts } | RetryResult::Aborted { error, attempts } => {
                self.metrics.record_publish_outcome(topic, false);
                tracing::error!(
                    topic = %topic,
                    key = %key,
                    attempts,
                    error = %error,
                    "Event publication failed"
                );
                Err(PublishError::Exhausted {
                    topic: topic.to_string(),
                    attempts,
                    source: error.into(),
                })
            }
        }
    }
}
