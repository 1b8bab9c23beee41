use super::context::{settle, TicketingContext};
use super::entities::Ticket;
use super::errors::{ErrorKind, TicketError};
use super::events::TicketCheckedIn;
use super::value_objects::TicketStatus;
use crate::messaging::publish_event;
use crate::store::{TicketStore, UnitOfWork};

// ============================================================================
// Check-in Coordinator
// ============================================================================
//
// Lock the ticket matching (code, active) → Active→Used → commit → announce.
//
// The lock predicate includes `status = active`, so once one redemption
// commits every later one finds nothing to lock.
//
// ============================================================================

pub struct CheckinCoordinator {
    ctx: TicketingContext,
}

impl CheckinCoordinator {
    pub fn new(ctx: TicketingContext) -> Self {
        Self { ctx }
    }

    /// Redeem `code` exactly once; returns the ticket as Used.
    pub async fn checkin(&self, code: &str) -> Result<Ticket, TicketError> {
        require_code(code)?;

        let result = self.redeem(code).await;

        match &result {
            Ok(ticket) => {
                self.ctx.metrics.record_checkin("redeemed");
                tracing::info!(
                    ticket_id = ticket.id,
                    event_id = ticket.event_id,
                    user_id = ticket.user_id,
                    "Ticket checked in"
                );
                self.announce(ticket).await;
            }
            Err(error) if error.kind() == ErrorKind::Transient => {
                self.ctx.metrics.record_checkin("failed");
                tracing::error!(error = %error, "Check-in failed");
            }
            Err(error) => {
                self.ctx.metrics.record_checkin("rejected");
                tracing::info!(reason = error.reason(), "Check-in rejected");
            }
        }

        result
    }

    /// Advisory: an active ticket with `code` exists right now.
    pub async fn is_exist(&self, code: &str) -> Result<bool, TicketError> {
        require_code(code)?;
        Ok(self.ctx.database.active_ticket_exists(code).await?)
    }

    async fn redeem(&self, code: &str) -> Result<Ticket, TicketError> {
        let mut uow = self.ctx.database.begin().await?;
        let result = redeem_within(uow.as_mut(), code).await;
        settle(uow, result).await
    }

    async fn announce(&self, ticket: &Ticket) {
        let event = TicketCheckedIn::from_ticket(ticket, self.ctx.clock.now());
        let topic = &self.ctx.topics.ticket_checkin;

        if let Err(error) = publish_event(self.ctx.publisher.as_ref(), topic, &event).await {
            tracing::warn!(
                ticket_id = ticket.id,
                event_id = ticket.event_id,
                error = %error,
                "Ticket checked in but check-in event was not published"
            );
        }
    }
}

async fn redeem_within(uow: &mut dyn UnitOfWork, code: &str) -> Result<Ticket, TicketError> {
    let ticket = uow
        .lock_active_ticket(code)
        .await?
        .ok_or(TicketError::TicketNotFoundOrNotActive)?;

    ticket
        .status
        .transition_to(TicketStatus::Used)
        .map_err(|(from, to)| TicketError::InvalidStatusTransition { from, to })?;

    uow.mark_used(ticket.id)
        .await?
        .ok_or(TicketError::TicketNotFoundOrNotActive)
}

fn require_code(code: &str) -> Result<(), TicketError> {
    if code.trim().is_empty() {
        return Err(TicketError::InvalidRequest("code is required".into()));
    }
    Ok(())
}
