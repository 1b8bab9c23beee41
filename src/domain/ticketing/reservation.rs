use std::time::Instant;

use super::commands::ReserveTicket;
use super::context::{require_published, settle, TicketingContext};
use super::entities::{NewTicket, SalesWindow, Ticket};
use super::errors::{ErrorKind, TicketError};
use super::events::TicketPurchased;
use crate::messaging::publish_event;
use crate::store::{InventoryLedger, StoreError, TicketStore, UnitOfWork};
use crate::utils::{retry_when, RetryConfig, RetryResult};

// ============================================================================
// Reservation Coordinator
// ============================================================================
//
// Catalog check → lock ticket type → window + capacity check → sold += 1 and
// insert ticket → commit → announce.
//
// All reads and writes of `sold` happen under the ticket type's row lock in
// one transaction, so capacity is never exceeded. A code collision restarts
// the whole transaction with a fresh code, a bounded number of times.
//
// ============================================================================

pub struct ReservationCoordinator {
    ctx: TicketingContext,
    max_code_attempts: u32,
}

impl ReservationCoordinator {
    pub fn new(ctx: TicketingContext, max_code_attempts: u32) -> Self {
        Self {
            ctx,
            max_code_attempts: max_code_attempts.max(1),
        }
    }

    pub async fn reserve(&self, command: ReserveTicket) -> Result<Ticket, TicketError> {
        let started = Instant::now();
        let result = self.grant(&command).await;
        let elapsed = started.elapsed().as_secs_f64();

        match &result {
            Ok(ticket) => {
                self.ctx.metrics.record_reservation_granted(elapsed);
                tracing::info!(
                    ticket_id = ticket.id,
                    event_id = ticket.event_id,
                    ticket_type_id = ticket.ticket_type_id,
                    user_id = ticket.user_id,
                    "Ticket granted"
                );
                self.announce(ticket).await;
            }
            Err(error) => {
                let transient = error.kind() == ErrorKind::Transient;
                self.ctx
                    .metrics
                    .record_reservation_rejected(error.reason(), transient, elapsed);

                if transient {
                    tracing::error!(
                        event_id = command.event_id,
                        ticket_type_id = command.ticket_type_id,
                        error = %error,
                        "Reservation failed"
                    );
                } else {
                    tracing::info!(
                        event_id = command.event_id,
                        ticket_type_id = command.ticket_type_id,
                        reason = error.reason(),
                        "Reservation rejected"
                    );
                }
            }
        }

        result
    }

    async fn grant(&self, command: &ReserveTicket) -> Result<Ticket, TicketError> {
        require_published(self.ctx.gateway.as_ref(), command.event_id).await?;

        let retry = RetryConfig::immediate(self.max_code_attempts);
        let result = retry_when(&retry, is_code_collision, move |attempt| {
            self.attempt(command, attempt)
        })
        .await;

        match result {
            RetryResult::Success { value, .. } => Ok(value),
            RetryResult::Exhausted { attempts, .. } => {
                Err(TicketError::CodeGenerationExhausted { attempts })
            }
            RetryResult::Aborted { error, .. } => Err(error),
        }
    }

    /// One whole transaction with a freshly generated code.
    async fn attempt(&self, command: &ReserveTicket, attempt: u32) -> Result<Ticket, TicketError> {
        let mut uow = self.ctx.database.begin().await?;
        let result = self.grant_within(uow.as_mut(), command).await;
        let result = settle(uow, result).await;

        if let Err(error) = &result {
            if is_code_collision(error) {
                self.ctx.metrics.record_code_collision();
                tracing::warn!(
                    ticket_type_id = command.ticket_type_id,
                    attempt,
                    "Generated ticket code already taken"
                );
            }
        }
        result
    }

    async fn grant_within(
        &self,
        uow: &mut dyn UnitOfWork,
        command: &ReserveTicket,
    ) -> Result<Ticket, TicketError> {
        let ticket_type = uow
            .lock_ticket_type(command.ticket_type_id)
            .await?
            .filter(|tt| tt.event_id == command.event_id)
            .ok_or(TicketError::TicketTypeNotFound(command.ticket_type_id))?;

        let now = self.ctx.clock.now();
        match ticket_type.sales_window_at(now) {
            SalesWindow::NotStarted => return Err(TicketError::EventNotStarted),
            SalesWindow::Ended => return Err(TicketError::EventEnded),
            SalesWindow::Open => {}
        }

        if ticket_type.is_sold_out() {
            return Err(TicketError::TicketSoldOut);
        }

        match uow.increment_sold(ticket_type.id).await {
            Err(StoreError::CapacityExceeded(_)) => return Err(TicketError::TicketSoldOut),
            other => other?,
        }

        let ticket = uow
            .insert_ticket(NewTicket {
                event_id: ticket_type.event_id,
                ticket_type_id: ticket_type.id,
                user_id: command.user_id,
                code: self.ctx.codes.generate(),
                created_at: now,
            })
            .await?;

        tracing::debug!(
            ticket_type_id = ticket_type.id,
            remaining = ticket_type.remaining() - 1,
            "Capacity consumed"
        );
        Ok(ticket)
    }

    async fn announce(&self, ticket: &Ticket) {
        let event = TicketPurchased::from_ticket(ticket);
        let topic = &self.ctx.topics.ticket_purchased;

        if let Err(error) = publish_event(self.ctx.publisher.as_ref(), topic, &event).await {
            tracing::warn!(
                ticket_id = ticket.id,
                event_id = ticket.event_id,
                error = %error,
                "Ticket granted but purchase event was not published"
            );
        }
    }
}

fn is_code_collision(error: &TicketError) -> bool {
    matches!(error, TicketError::Store(StoreError::DuplicateCode))
}
