// ============================================================================
// Messaging - delivery of ticket events to Redpanda/Kafka
// ============================================================================
//
// - `MessageBus`: one send attempt, no retry (Redpanda client with circuit
//   breaker in production)
// - `EventPublisher`: what the coordinators call; retries a bus with bounded
//   exponential backoff and reports the terminal failure
//
// ============================================================================

mod publisher;
mod redpanda;


pub use publisher::{publish_event, EventPublisher, PublishError, RetryingPublisher};
pub use redpanda::RedpandaClient;

use async_trait::async_trait;

use crate::utils::CircuitState;

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Single delivery attempt.
    async fn send(&self, topic: &str, key: &str, payload: &str) -> anyhow::Result<()>;

    async fn circuit_state(&self) -> CircuitState {
        CircuitState::Closed
    }
}
