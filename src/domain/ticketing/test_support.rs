use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::checkin::CheckinCoordinator;
use super::codes::{CodeGenerator, UuidCodeGenerator};
use super::context::TicketingContext;
use super::entities::{NewTicketType, TicketType};
use super::events::EventTopics;
use super::reservation::ReservationCoordinator;
use super::value_objects::{TicketCode, TicketKind};
use crate::gateway::{EventGateway, EventSnapshot, GatewayError};
use crate::messaging::{EventPublisher, MessageBus, PublishError, RetryingPublisher};
use crate::metrics::Metrics;
use crate::store::in_memory::InMemoryStore;
use crate::store::TicketingDatabase;
use crate::utils::{Clock, RetryConfig};

/// Settable clock.
pub(crate) struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub(crate) fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Catalog with a fixed set of events; unknown ids answer 404.
#[derive(Default)]
pub(crate) struct StubGateway {
    statuses: Mutex<HashMap<i64, String>>,
    unreachable: Mutex<bool>,
}

impl StubGateway {
    pub(crate) fn set_status(&self, event_id: i64, status: &str) {
        self.statuses.lock().unwrap().insert(event_id, status.to_string());
    }

    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock().unwrap() = unreachable;
    }
}

#[async_trait]
impl EventGateway for StubGateway {
    async fn get_event(&self, event_id: i64) -> Result<EventSnapshot, GatewayError> {
        if *self.unreachable.lock().unwrap() {
            return Err(GatewayError::Transport("connection refused".into()));
        }

        self.statuses
            .lock()
            .unwrap()
            .get(&event_id)
            .map(|status| EventSnapshot { status: status.clone() })
            .ok_or(GatewayError::NotFound { event_id, status: 404 })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PublishedMessage {
    pub(crate) topic: String,
    pub(crate) key: String,
    pub(crate) payload: serde_json::Value,
}

#[derive(Default)]
pub(crate) struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
}

impl RecordingPublisher {
    pub(crate) fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), PublishError> {
        self.messages.lock().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: serde_json::from_str(payload).unwrap(),
        });
        Ok(())
    }
}

/// Hands out the given codes in order, then random ones.
pub(crate) struct SequenceCodes(Mutex<VecDeque<String>>);

impl SequenceCodes {
    pub(crate) fn new<const N: usize>(codes: [&str; N]) -> Self {
        Self(Mutex::new(codes.iter().map(|c| c.to_string()).collect()))
    }
}

impl CodeGenerator for SequenceCodes {
    fn generate(&self) -> TicketCode {
        match self.0.lock().unwrap().pop_front() {
            Some(code) => TicketCode::new(code),
            None => UuidCodeGenerator.generate(),
        }
    }
}

/// In-memory wiring of every ticketing collaborator.
pub(crate) struct Harness {
    pub(crate) store: InMemoryStore,
    pub(crate) gateway: Arc<StubGateway>,
    pub(crate) publisher: Arc<RecordingPublisher>,
    pub(crate) clock: Arc<FixedClock>,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) ctx: TicketingContext,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::build(Arc::new(UuidCodeGenerator), None)
    }

    pub(crate) fn with_codes(codes: SequenceCodes) -> Self {
        Self::build(Arc::new(codes), None)
    }

    /// Publish through a real retrying publisher over `bus`.
    pub(crate) fn with_bus(bus: Arc<dyn MessageBus>) -> Self {
        Self::build(Arc::new(UuidCodeGenerator), Some(bus))
    }

    fn build(codes: Arc<dyn CodeGenerator>, bus: Option<Arc<dyn MessageBus>>) -> Self {
        let store = InMemoryStore::new();
        let gateway = Arc::new(StubGateway::default());
        gateway.set_status(1, "published");
        let publisher = Arc::new(RecordingPublisher::default());
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let metrics = Arc::new(Metrics::new().unwrap());

        let event_publisher: Arc<dyn EventPublisher> = match bus {
            Some(bus) => Arc::new(RetryingPublisher::new(bus, RetryConfig::default(), metrics.clone())),
            None => publisher.clone(),
        };

        let ctx = TicketingContext {
            database: Arc::new(store.clone()),
            gateway: gateway.clone(),
            publisher: event_publisher,
            codes,
            clock: clock.clone(),
            metrics: metrics.clone(),
            topics: EventTopics::default(),
        };

        Self {
            store,
            gateway,
            publisher,
            clock,
            metrics,
            ctx,
        }
    }

    pub(crate) fn reservations(&self) -> ReservationCoordinator {
        ReservationCoordinator::new(self.ctx.clone(), 3)
    }

    pub(crate) fn checkins(&self) -> CheckinCoordinator {
        CheckinCoordinator::new(self.ctx.clone())
    }

    /// Ticket type whose sales window is open at the harness clock.
    pub(crate) async fn open_ticket_type(&self, event_id: i64, quantity: i32) -> TicketType {
        let now = self.clock.now();
        self.store
            .create_ticket_type(NewTicketType {
                event_id,
                kind: TicketKind::Standard,
                price: 2_500,
                quantity,
                sales_start: now - Duration::hours(1),
                sales_end: now + Duration::hours(1),
            })
            .await
            .unwrap()
    }

    pub(crate) async fn sold(&self, ticket_type_id: i64) -> i32 {
        self.store
            .get_ticket_type(ticket_type_id)
            .await
            .unwrap()
            .map_or(0, |tt| tt.sold)
    }
}
