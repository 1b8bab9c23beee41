use std::sync::Arc;

use super::codes::CodeGenerator;
use super::errors::TicketError;
use super::events::EventTopics;
use crate::gateway::EventGateway;
use crate::messaging::EventPublisher;
use crate::metrics::Metrics;
use crate::store::{TicketingDatabase, UnitOfWork};
use crate::utils::Clock;

/// Collaborators shared by every ticketing operation.
#[derive(Clone)]
pub struct TicketingContext {
    pub database: Arc<dyn TicketingDatabase>,
    pub gateway: Arc<dyn EventGateway>,
    pub publisher: Arc<dyn EventPublisher>,
    pub codes: Arc<dyn CodeGenerator>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<Metrics>,
    pub topics: EventTopics,
}

/// Commit on success, roll back on failure.
///
/// A failed rollback is only logged: the transaction is discarded with its
/// connection either way, and the original error is what the caller needs.
pub(crate) async fn settle<T>(
    mut uow: Box<dyn UnitOfWork>,
    result: Result<T, TicketError>,
) -> Result<T, TicketError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                tracing::warn!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}

/// Fails unless the catalog reports the event as published.
pub(crate) async fn require_published(
    gateway: &dyn EventGateway,
    event_id: i64,
) -> Result<(), TicketError> {
    let event = gateway.get_event(event_id).await?;

    if !event.is_published() {
        tracing::debug!(event_id, status = %event.status, "Event is not published");
        return Err(TicketError::EventNotPublished(event_id));
    }
    Ok(())
}
