// ============================================================================
// Ticketing Domain - ticket types, reservations and check-ins
// ============================================================================
//
// This module contains ALL ticketing-specific code:
// - Value objects (TicketKind, TicketStatus, TicketCode)
// - Entities (TicketType, Ticket) and list filters
// - Commands (ReserveTicket, CreateTicketType)
// - Events (TicketPurchased, TicketCheckedIn)
// - Errors (TicketError)
// - Coordinators (reservation, check-in) and the ticket type service
//
// ============================================================================

pub mod checkin;
pub mod codes;
pub mod commands;
pub mod context;
pub mod entities;
pub mod errors;
pub mod events;
pub mod queries;
pub mod reservation;
pub mod ticket_types;
pub mod value_objects;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export for convenience
pub use checkin::*;
pub use codes::*;
pub use commands::*;
pub use context::TicketingContext;
pub use entities::*;
pub use errors::*;
pub use events::*;
pub use queries::*;
pub use reservation::*;
pub use ticket_types::*;
pub use value_objects::*;
