// ============================================================================
// Ticketing Store - storage capabilities behind the coordinators
// ============================================================================
//
// The coordinators only see these traits. A `UnitOfWork` is one database
// transaction: every lock it takes is held until `commit` or `rollback`, and
// nothing it writes is visible to others before `commit`. Dropping an
// unfinished unit of work rolls it back.
//
// - `InventoryLedger`: locked reads and increments of a ticket type's `sold`
// - `TicketStore`: ticket inserts (code uniqueness) and locked status changes
// - `TicketingDatabase`: opens units of work, plus unlocked reads
//
// ============================================================================

mod postgres;

#[cfg(test)]
pub(crate) mod in_memory;

pub use postgres::PgTicketingStore;

use async_trait::async_trait;

use crate::domain::ticketing::{NewTicket, NewTicketType, Ticket, TicketListFilter, TicketType};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("ticket code is already taken")]
    DuplicateCode,

    #[error("timed out waiting for a row lock")]
    LockTimeout,

    #[error("ticket type {0} has no capacity left")]
    CapacityExceeded(i64),

    #[error("corrupt row: {0}")]
    CorruptRow(String),

    #[error("unit of work already finished")]
    TransactionClosed,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

#[async_trait]
pub trait InventoryLedger: Send {
    /// Exclusive lock on one ticket type row, held for the unit of work.
    async fn lock_ticket_type(&mut self, id: i64) -> Result<Option<TicketType>, StoreError>;

    /// `sold += 1`, refused with `CapacityExceeded` once `sold == quantity`.
    async fn increment_sold(&mut self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TicketStore: Send {
    /// Fails with `DuplicateCode` if any ticket, in any status, has the code.
    async fn insert_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError>;

    /// Exclusive lock on the ticket with `code`, only if it is still active.
    async fn lock_active_ticket(&mut self, code: &str) -> Result<Option<Ticket>, StoreError>;

    /// Active -> Used. `None` when the ticket is no longer active.
    async fn mark_used(&mut self, ticket_id: i64) -> Result<Option<Ticket>, StoreError>;
}

#[async_trait]
pub trait UnitOfWork: InventoryLedger + TicketStore {
    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn rollback(&mut self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TicketingDatabase: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    async fn create_ticket_type(&self, ticket_type: NewTicketType) -> Result<TicketType, StoreError>;

    async fn get_ticket_type(&self, id: i64) -> Result<Option<TicketType>, StoreError>;

    async fn list_tickets(&self, filter: &TicketListFilter) -> Result<Vec<Ticket>, StoreError>;

    /// Advisory: not locked, may race with a concurrent check-in.
    async fn active_ticket_exists(&self, code: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
