use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::Ticket;
use super::value_objects::TicketStatus;

// ============================================================================
// Ticket Events - announced to the rest of the platform after commit
// ============================================================================

pub const TOPIC_TICKET_PURCHASED: &str = "ticket.purchased";
pub const TOPIC_TICKET_CHECKIN: &str = "ticket.checkin";

/// An event that can be put on the bus.
pub trait TicketEvent: Serialize + Send + Sync {
    fn event_type() -> &'static str
    where
        Self: Sized;

    /// Partition key; all messages of one event share a partition.
    fn partition_key(&self) -> String;
}

/// Topic names, configurable per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTopics {
    pub ticket_purchased: String,
    pub ticket_checkin: String,
}

impl Default for EventTopics {
    fn default() -> Self {
        Self {
            ticket_purchased: TOPIC_TICKET_PURCHASED.to_string(),
            ticket_checkin: TOPIC_TICKET_CHECKIN.to_string(),
        }
    }
}

/// Ticket Purchased - a ticket was durably granted
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TicketPurchased {
    pub ticket_id: i64,
    pub event_id: i64,
    pub ticket_type_id: i64,
    pub user_id: i64,
    pub code: String,
    pub status: TicketStatus,
    pub purchased_at: DateTime<Utc>,
}

impl TicketPurchased {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id,
            event_id: ticket.event_id,
            ticket_type_id: ticket.ticket_type_id,
            user_id: ticket.user_id,
            code: ticket.code.as_str().to_string(),
            status: ticket.status,
            purchased_at: ticket.created_at,
        }
    }
}

impl TicketEvent for TicketPurchased {
    fn event_type() -> &'static str {
        "TicketPurchased"
    }

    fn partition_key(&self) -> String {
        self.event_id.to_string()
    }
}

/// Ticket Checked In - a ticket was redeemed at the door
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TicketCheckedIn {
    pub ticket_id: i64,
    pub event_id: i64,
    pub ticket_type_id: i64,
    pub user_id: i64,
    pub checked_in_at: DateTime<Utc>,
}

impl TicketCheckedIn {
    pub fn from_ticket(ticket: &Ticket, checked_in_at: DateTime<Utc>) -> Self {
        Self {
            ticket_id: ticket.id,
            event_id: ticket.event_id,
            ticket_type_id: ticket.ticket_type_id,
            user_id: ticket.user_id,
            checked_in_at,
        }
    }
}

impl TicketEvent for TicketCheckedIn {
    fn event_type() -> &'static str {
        "TicketCheckedIn"
    }

    fn partition_key(&self) -> String {
        self.event_id.to_string()
    }
}
