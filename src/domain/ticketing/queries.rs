use std::sync::Arc;

use super::entities::{Ticket, TicketListFilter};
use super::errors::TicketError;
use crate::store::TicketingDatabase;

/// Unlocked reads for listings.
pub struct TicketQueries {
    database: Arc<dyn TicketingDatabase>,
}

impl TicketQueries {
    pub fn new(database: Arc<dyn TicketingDatabase>) -> Self {
        Self { database }
    }

    /// Newest first; page size defaults to 100 and never exceeds 500.
    pub async fn list(&self, filter: &TicketListFilter) -> Result<Vec<Ticket>, TicketError> {
        Ok(self.database.list_tickets(filter).await?)
    }
}
