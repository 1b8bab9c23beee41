// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// Re-export for public API
pub use server::start_metrics_server;

use crate::utils::CircuitState;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Provides metrics for:
// - Reservations (grants, rejections by reason, latency by outcome)
// - Ticket code collisions
// - Check-ins by outcome
// - Event publication attempts and outcomes per topic
// - Message bus circuit breaker state
//
// All metrics are registered with Prometheus and can be scraped via /metrics
// ============================================================================

pub const OUTCOME_GRANTED: &str = "granted";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_FAILED: &str = "failed";

/// Central metrics registry for the entire application
pub struct Metrics {
    registry: Registry,

    // Reservation Metrics
    pub tickets_reserved: IntCounter,
    pub reservation_rejections: IntCounterVec,
    pub reservation_duration: HistogramVec,
    pub ticket_code_collisions: IntCounter,

    // Check-in Metrics
    pub ticket_checkins: IntCounterVec,

    // Publication Metrics
    pub publish_attempts: IntCounterVec,
    pub publish_success: IntCounterVec,
    pub publish_failures: IntCounterVec,

    // Circuit Breaker Metrics
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        // Reservation Metrics
        let tickets_reserved = IntCounter::new("tickets_reserved_total", "Total tickets granted")?;
        registry.register(Box::new(tickets_reserved.clone()))?;

        let reservation_rejections = IntCounterVec::new(
            Opts::new("reservation_rejections_total", "Reservations refused or failed"),
            &["reason"],
        )?;
        registry.register(Box::new(reservation_rejections.clone()))?;

        let reservation_duration = HistogramVec::new(
            HistogramOpts::new("reservation_duration_seconds", "Reservation latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(reservation_duration.clone()))?;

        let ticket_code_collisions = IntCounter::new(
            "ticket_code_collisions_total",
            "Reservation attempts retried because the generated code was taken",
        )?;
        registry.register(Box::new(ticket_code_collisions.clone()))?;

        // Check-in Metrics
        let ticket_checkins = IntCounterVec::new(
            Opts::new("ticket_checkins_total", "Check-in attempts"),
            &["outcome"],
        )?;
        registry.register(Box::new(ticket_checkins.clone()))?;

        // Publication Metrics
        let publish_attempts = IntCounterVec::new(
            Opts::new("event_publish_attempts_total", "Individual publish attempts"),
            &["topic"],
        )?;
        registry.register(Box::new(publish_attempts.clone()))?;

        let publish_success = IntCounterVec::new(
            Opts::new("event_publish_success_total", "Events delivered to the bus"),
            &["topic"],
        )?;
        registry.register(Box::new(publish_success.clone()))?;

        let publish_failures = IntCounterVec::new(
            Opts::new("event_publish_failures_total", "Events dropped after all attempts"),
            &["topic"],
        )?;
        registry.register(Box::new(publish_failures.clone()))?;

        // Circuit Breaker Metrics
        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            tickets_reserved,
            reservation_rejections,
            reservation_duration,
            ticket_code_collisions,
            ticket_checkins,
            publish_attempts,
            publish_success,
            publish_failures,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_reservation_granted(&self, duration_secs: f64) {
        self.tickets_reserved.inc();
        self.reservation_duration
            .with_label_values(&[OUTCOME_GRANTED])
            .observe(duration_secs);
    }

    /// `transient` separates infrastructure failures from business refusals.
    pub fn record_reservation_rejected(&self, reason: &str, transient: bool, duration_secs: f64) {
        let outcome = if transient { OUTCOME_FAILED } else { OUTCOME_REJECTED };
        self.reservation_rejections.with_label_values(&[reason]).inc();
        self.reservation_duration
            .with_label_values(&[outcome])
            .observe(duration_secs);
    }

    pub fn record_code_collision(&self) {
        self.ticket_code_collisions.inc();
    }

    pub fn record_checkin(&self, outcome: &str) {
        self.ticket_checkins.with_label_values(&[outcome]).inc();
    }

    pub fn record_publish_attempt(&self, topic: &str) {
        self.publish_attempts.with_label_values(&[topic]).inc();
    }

    pub fn record_publish_outcome(&self, topic: &str, success: bool) {
        if success {
            self.publish_success.with_label_values(&[topic]).inc();
        } else {
            self.publish_failures.with_label_values(&[topic]).inc();
        }
    }

    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        self.circuit_breaker_state.set(state.as_gauge());
    }
}

#[cfg(test)]
pub(crate) fn counter_value(metrics: &Metrics, name: &str, label: Option<&str>) -> f64 {
    metrics
        .registry()
        .gather()
        .iter()
        .find(|m| m.name() == name)
        .map(|family| {
            family
                .metric
                .iter()
                .filter(|m| label.map_or(true, |l| m.label.iter().any(|p| p.value() == l)))
                .map(|m| m.counter.value.unwrap_or(0.0))
                .sum()
        })
        .unwrap_or(0.0)
}
