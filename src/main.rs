use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod gateway;
mod health;
mod messaging;
mod metrics;
mod store;
mod utils;

use config::AppConfig;
use domain::ticketing::{TicketingContext, UuidCodeGenerator};
use gateway::HttpEventClient;
use health::HealthProbe;
use messaging::{MessageBus, RedpandaClient, RetryingPublisher};
use store::PgTicketingStore;
use utils::SystemClock;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ticket_service=debug")),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(environment = %config.environment, "🚀 Starting ticket service");

    // === 1. PostgreSQL ===
    let database = Arc::new(PgTicketingStore::connect(&config.database).await?);
    database.ensure_schema().await?;

    // === 2. Prometheus metrics ===
    let metrics = Arc::new(metrics::Metrics::new()?);

    // === 3. Redpanda client (with circuit breaker) and retrying publisher ===
    let bus: Arc<dyn MessageBus> = Arc::new(RedpandaClient::new(
        &config.kafka.brokers,
        config.kafka.message_timeout,
    )?);
    let publisher = Arc::new(RetryingPublisher::new(
        bus.clone(),
        config.publish.clone(),
        metrics.clone(),
    ));
    tracing::info!(
        max_attempts = config.publish.max_attempts,
        worst_case_backoff_ms = config.publish.total_backoff().as_millis() as u64,
        "Event publisher ready"
    );

    // === 4. Event catalog ===
    let gateway = Arc::new(HttpEventClient::new(
        config.event_service.base_url.clone(),
        config.event_service.timeout,
    )?);

    let ctx = TicketingContext {
        database: database.clone(),
        gateway,
        publisher,
        codes: Arc::new(UuidCodeGenerator),
        clock: Arc::new(SystemClock),
        metrics: metrics.clone(),
        topics: config.kafka.topics.clone(),
    };
    let state = web::Data::new(api::AppState::new(
        ctx,
        config.reservation.max_code_attempts,
    ));

    // === 5. Servers ===
    let probe = HealthProbe::new(database, bus, metrics.clone());
    let metrics_server = metrics::start_metrics_server(
        metrics,
        probe,
        config.server.host.clone(),
        config.server.metrics_port,
    );

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        "Ticket API listening"
    );
    let api_server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::configure)
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run();

    futures_util::future::try_join(api_server, metrics_server).await?;

    tracing::info!("Ticket service stopped");
    Ok(())
}
