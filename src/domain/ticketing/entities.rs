use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{TicketCode, TicketKind, TicketStatus};

// ============================================================================
// Ticketing Entities
// ============================================================================

/// A priced admission category with fixed capacity and a sales window.
///
/// `quantity` never changes after creation. `sold` only grows, and only under
/// the row lock taken by a reservation, so `0 <= sold <= quantity` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketType {
    pub id: i64,
    pub event_id: i64,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    pub price: i64,
    pub quantity: i32,
    pub sold: i32,
    pub sales_start: DateTime<Utc>,
    pub sales_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where `at` falls relative to a sales window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesWindow {
    NotStarted,
    Open,
    Ended,
}

impl TicketType {
    pub fn sales_window_at(&self, at: DateTime<Utc>) -> SalesWindow {
        if at < self.sales_start {
            SalesWindow::NotStarted
        } else if at >= self.sales_end {
            SalesWindow::Ended
        } else {
            SalesWindow::Open
        }
    }

    pub fn remaining(&self) -> i32 {
        (self.quantity - self.sold).max(0)
    }

    pub fn is_sold_out(&self) -> bool {
        self.sold >= self.quantity
    }
}

/// Fields supplied when an organizer creates a ticket type.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicketType {
    pub event_id: i64,
    pub kind: TicketKind,
    pub price: i64,
    pub quantity: i32,
    pub sales_start: DateTime<Utc>,
    pub sales_end: DateTime<Utc>,
}

/// An issued ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub ticket_type_id: i64,
    pub user_id: i64,
    pub code: TicketCode,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A ticket about to be inserted; always starts `Active`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub event_id: i64,
    pub ticket_type_id: i64,
    pub user_id: i64,
    pub code: TicketCode,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TicketListFilter {
    pub event_id: Option<i64>,
    pub user_id: Option<i64>,
    pub status: Option<TicketStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TicketListFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        self.event_id.map_or(true, |id| ticket.event_id == id)
            && self.user_id.map_or(true, |id| ticket.user_id == id)
            && self.status.map_or(true, |status| ticket.status == status)
    }
}
