// ============================================================================
// Event Catalog Gateway
// ============================================================================
//
// The ticketing core never owns events; it asks the upstream catalog whether
// an event exists and is published before selling or configuring tickets.
//
// ============================================================================

mod event_client;

pub use event_client::HttpEventClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const STATUS_PUBLISHED: &str = "published";

/// What the catalog reports about one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub status: String,
}

impl EventSnapshot {
    pub fn is_published(&self) -> bool {
        self.status == STATUS_PUBLISHED
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Any non-200 answer, 404 included.
    #[error("event {event_id} not found (upstream status {status})")]
    NotFound { event_id: i64, status: u16 },

    #[error("event service unreachable: {0}")]
    Transport(String),

    #[error("invalid event service response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait EventGateway: Send + Sync {
    async fn get_event(&self, event_id: i64) -> Result<EventSnapshot, GatewayError>;
}
