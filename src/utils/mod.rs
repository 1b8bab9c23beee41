pub mod circuit_breaker;
pub mod clock;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use clock::{Clock, SystemClock};
pub use retry::{retry_when, retry_with_backoff, RetryConfig, RetryResult};
