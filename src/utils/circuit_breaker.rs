use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards calls to the message broker. After `failure_threshold` consecutive
// failures the circuit opens and calls fail fast; once `open_timeout` has
// passed one probe is let through (half-open) and `success_threshold`
// successes close the circuit again.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric encoding exported as the `circuit_breaker_state` gauge.
    pub fn as_gauge(self) -> i64 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a probe is allowed
    pub open_timeout: Duration,
    /// Successes in half-open state needed to close the circuit
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug)]
enum Phase {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { successes: u32 },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error(transparent)]
    OperationFailed(E),
}

#[derive(Clone)]
pub struct CircuitBreaker {
    phase: Arc<Mutex<Phase>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            phase: Arc::new(Mutex::new(Phase::Closed { consecutive_failures: 0 })),
            config,
        }
    }

    /// Run `operation` unless the circuit is open.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        if !self.admit().await {
            return Err(CircuitBreakerError::CircuitOpen);
        }

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(error) => {
                self.on_failure().await;
                Err(CircuitBreakerError::OperationFailed(error))
            }
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.phase.lock().await.state()
    }

    async fn admit(&self) -> bool {
        let mut phase = self.phase.lock().await;

        if let Phase::Open { opened_at } = *phase {
            if opened_at.elapsed() < self.config.open_timeout {
                return false;
            }
            tracing::info!("Circuit breaker half-open, probing broker");
            *phase = Phase::HalfOpen { successes: 0 };
        }

        true
    }

    async fn on_success(&self) {
        let mut phase = self.phase.lock().await;

        match &mut *phase {
            Phase::Closed { consecutive_failures } => *consecutive_failures = 0,
            Phase::HalfOpen { successes } => {
                *successes += 1;
                if *successes >= self.config.success_threshold {
                    tracing::info!(successes = *successes, "Circuit breaker closed");
                    *phase = Phase::Closed { consecutive_failures: 0 };
                }
            }
            Phase::Open { .. } => {}
        }
    }

    async fn on_failure(&self) {
        let mut phase = self.phase.lock().await;

        match &mut *phase {
            Phase::Closed { consecutive_failures } => {
                *consecutive_failures += 1;
                if *consecutive_failures >= self.config.failure_threshold {
                    tracing::warn!(
                        failures = *consecutive_failures,
                        "Circuit breaker opened"
                    );
                    *phase = Phase::Open { opened_at: Instant::now() };
                }
            }
            Phase::HalfOpen { .. } => {
                tracing::warn!("Probe failed, circuit breaker re-opened");
                *phase = Phase::Open { opened_at: Instant::now() };
            }
            Phase::Open { opened_at } => *opened_at = Instant::now(),
        }
    }
}
