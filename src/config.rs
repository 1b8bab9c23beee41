use std::str::FromStr;
use std::time::Duration;

use crate::domain::ticketing::EventTopics;
use crate::utils::RetryConfig;

// ============================================================================
// Configuration - loaded once at startup from the environment
// ============================================================================
//
// `from_env` reads an optional `.env` file and then the process environment.
// The parsing itself works over any key lookup so tests never touch the real
// environment. A missing required key or a malformed value stops startup.
//
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub event_service: EventServiceConfig,
    pub kafka: KafkaConfig,
    pub publish: RetryConfig,
    pub reservation: ReservationConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub metrics_port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    /// Upper bound on waiting for a row lock.
    pub lock_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EventServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: String,
    pub topics: EventTopics,
    pub message_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ReservationConfig {
    /// Whole-transaction attempts when a generated code is already taken.
    pub max_code_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Ignoring unreadable .env file");
            }
        }

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        Ok(Self {
            environment: env.string_or("APP_ENV", "development"),
            server: ServerConfig {
                host: env.string_or("SERVICE_HOST", "0.0.0.0"),
                port: env.parse_or("SERVICE_PORT", 8082)?,
                metrics_port: env.parse_or("METRICS_PORT", 9090)?,
            },
            database: DatabaseConfig {
                url: database_url(&env),
                max_connections: env.parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
                acquire_timeout: Duration::from_secs(30),
                lock_timeout: env.millis_or("DATABASE_LOCK_TIMEOUT_MS", 5_000)?,
            },
            event_service: EventServiceConfig {
                base_url: env.required("EVENT_SERVICE_BASE_URL")?,
                timeout: env.millis_or("EVENT_SERVICE_TIMEOUT_MS", 3_000)?,
            },
            kafka: KafkaConfig {
                brokers: env.string_or("KAFKA_BROKER", "localhost:9092"),
                topics: EventTopics {
                    ticket_purchased: env.string_or(
                        "KAFKA_TOPIC_TICKET_PURCHASED",
                        &EventTopics::default().ticket_purchased,
                    ),
                    ticket_checkin: env.string_or(
                        "KAFKA_TOPIC_TICKET_CHECKIN",
                        &EventTopics::default().ticket_checkin,
                    ),
                },
                message_timeout: env.millis_or("KAFKA_MESSAGE_TIMEOUT_MS", 5_000)?,
            },
            publish: RetryConfig {
                max_attempts: env.parse_or("PUBLISH_MAX_ATTEMPTS", 3)?,
                initial_delay: env.millis_or("PUBLISH_INITIAL_BACKOFF_MS", 1_000)?,
                max_delay: env.millis_or("PUBLISH_MAX_BACKOFF_MS", 8_000)?,
                multiplier: 2.0,
            },
            reservation: ReservationConfig {
                max_code_attempts: env.parse_or("RESERVATION_MAX_CODE_ATTEMPTS", 3)?,
            },
        })
    }
}

/// `DATABASE_URL` wins; otherwise the DSN is assembled from the split keys.
fn database_url(env: &Env<'_>) -> String {
    if let Some(url) = env.get("DATABASE_URL") {
        return url;
    }

    format!(
        "postgres://{}:{}@{}:{}/{}?sslmode={}",
        env.string_or("POSTGRES_USER", "postgres"),
        env.string_or("POSTGRES_PASSWORD", "postgres"),
        env.string_or("POSTGRES_HOST", "localhost"),
        env.string_or("POSTGRES_PORT", "5432"),
        env.string_or("TICKETS_DB_NAME", "tickets"),
        env.string_or("DB_SSLMODE", "disable"),
    )
}

struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value }),
        }
    }

    fn millis_or(&self, key: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
        self.parse_or(key, default_ms).map(Duration::from_millis)
    }
}
