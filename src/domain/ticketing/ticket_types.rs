use super::commands::CreateTicketType;
use super::context::{require_published, TicketingContext};
use super::entities::TicketType;
use super::errors::TicketError;

/// Organizer-facing ticket type management.
pub struct TicketTypeService {
    ctx: TicketingContext,
}

impl TicketTypeService {
    pub fn new(ctx: TicketingContext) -> Self {
        Self { ctx }
    }

    pub async fn create(&self, event_id: i64, command: CreateTicketType) -> Result<TicketType, TicketError> {
        command.validate()?;
        require_published(self.ctx.gateway.as_ref(), event_id).await?;

        let ticket_type = self
            .ctx
            .database
            .create_ticket_type(command.into_new_ticket_type(event_id))
            .await?;

        tracing::info!(
            ticket_type_id = ticket_type.id,
            event_id,
            kind = ticket_type.kind.as_str(),
            quantity = ticket_type.quantity,
            "Ticket type created"
        );
        Ok(ticket_type)
    }

    pub async fn get(&self, id: i64) -> Result<TicketType, TicketError> {
        self.ctx
            .database
            .get_ticket_type(id)
            .await?
            .ok_or(TicketError::TicketTypeNotFound(id))
    }
}
