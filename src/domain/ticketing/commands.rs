use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::entities::NewTicketType;
use super::errors::TicketError;
use super::value_objects::TicketKind;

// ============================================================================
// Ticketing Commands - Represent caller intent
// ============================================================================

/// Grant one ticket of `ticket_type_id` for `event_id` to `user_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveTicket {
    pub event_id: i64,
    pub ticket_type_id: i64,
    pub user_id: i64,
}

/// Organizer request to open sales for a new ticket type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateTicketType {
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub price: i64,
    pub quantity: i32,
    pub sales_start: DateTime<Utc>,
    pub sales_end: DateTime<Utc>,
}

impl CreateTicketType {
    pub fn validate(&self) -> Result<(), TicketError> {
        if self.price <= 0 {
            return Err(TicketError::InvalidRequest("price must be greater than zero".into()));
        }
        if self.quantity <= 0 {
            return Err(TicketError::InvalidRequest("quantity must be greater than zero".into()));
        }
        if self.sales_start >= self.sales_end {
            return Err(TicketError::InvalidRequest(
                "sales_start must be before sales_end".into(),
            ));
        }
        Ok(())
    }

    pub fn into_new_ticket_type(self, event_id: i64) -> NewTicketType {
        NewTicketType {
            event_id,
            kind: self.kind,
            price: self.price,
            quantity: self.quantity,
            sales_start: self.sales_start,
            sales_end: self.sales_end,
        }
    }
}
