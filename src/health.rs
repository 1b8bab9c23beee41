use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::messaging::MessageBus;
use crate::metrics::Metrics;
use crate::store::{StoreError, TicketingDatabase};
use crate::utils::CircuitState;

// ============================================================================
// Health Check Abstractions
// ============================================================================
//
// The service is healthy when PostgreSQL answers and the message bus circuit
// is closed. An open or probing circuit only degrades the service: tickets
// are still granted and redeemed, events are just not delivered. A database
// outage makes the service unhealthy.
//
// ============================================================================

/// Health status of a component
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    pub fn is_unhealthy(&self) -> bool {
        matches!(self, HealthStatus::Unhealthy(_))
    }

    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded(_) => 1,
            HealthStatus::Unhealthy(_) => 2,
        }
    }
}

/// Health information for a component
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }

    pub fn database(ping: Result<(), StoreError>) -> Self {
        let status = match ping {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => HealthStatus::Unhealthy(e.to_string()),
        };
        Self::new("postgres", status)
    }

    pub fn message_bus(circuit: CircuitState) -> Self {
        let status = match circuit {
            CircuitState::Closed => HealthStatus::Healthy,
            CircuitState::HalfOpen | CircuitState::Open => {
                HealthStatus::Degraded(format!("circuit {}", circuit.as_str()))
            }
        };
        Self::new("redpanda", status)
    }
}

/// Aggregate of every component; the worst component wins.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub service: &'static str,
    pub components: Vec<ComponentHealth>,
}

impl HealthReport {
    pub fn from_components(components: Vec<ComponentHealth>) -> Self {
        let status = components
            .iter()
            .map(|c| &c.status)
            .max_by_key(|s| s.severity())
            .cloned()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            service: "ticket-service",
            components,
        }
    }
}

/// Collects a `HealthReport` from live dependencies.
#[derive(Clone)]
pub struct HealthProbe {
    database: Arc<dyn TicketingDatabase>,
    bus: Arc<dyn MessageBus>,
    metrics: Arc<Metrics>,
}

impl HealthProbe {
    pub fn new(database: Arc<dyn TicketingDatabase>, bus: Arc<dyn MessageBus>, metrics: Arc<Metrics>) -> Self {
        Self { database, bus, metrics }
    }

    pub async fn check(&self) -> HealthReport {
        let circuit = self.bus.circuit_state().await;
        self.metrics.update_circuit_breaker_state(circuit);

        let report = HealthReport::from_components(vec![
            ComponentHealth::database(self.database.ping().await),
            ComponentHealth::message_bus(circuit),
        ]);

        if !report.status.is_healthy() {
            tracing::warn!(status = ?report.status, "Health check not healthy");
        }
        report
    }
}
