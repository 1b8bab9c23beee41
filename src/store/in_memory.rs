use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{InventoryLedger, StoreError, TicketStore, TicketingDatabase, UnitOfWork};
use crate::domain::ticketing::{
    NewTicket, NewTicketType, Ticket, TicketCode, TicketListFilter, TicketStatus, TicketType,
};

// ============================================================================
// In-Memory Ticketing Store (tests)
// ============================================================================
//
// Mirrors the locking behaviour of the PostgreSQL store closely enough for
// concurrency tests:
// - every row has its own async mutex; a unit of work holds the guards of the
//   rows it locked until commit/rollback/drop
// - writes are buffered and applied atomically at commit
// - code uniqueness is checked on insert and again at commit
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RowKey {
    TicketType(i64),
    TicketCode(String),
}

#[derive(Default)]
struct Tables {
    ticket_types: BTreeMap<i64, TicketType>,
    tickets: BTreeMap<i64, Ticket>,
    last_ticket_type_id: i64,
    last_ticket_id: i64,
}

#[derive(Clone)]
pub(crate) struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    row_locks: Arc<Mutex<HashMap<RowKey, Arc<Mutex<()>>>>>,
    lock_timeout: Duration,
    failing_commits: Arc<AtomicU32>,
}

impl InMemoryStore {
    pub(crate) fn new() -> Self {
        Self::with_lock_timeout(Duration::from_secs(5))
    }

    pub(crate) fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            row_locks: Arc::new(Mutex::new(HashMap::new())),
            lock_timeout,
            failing_commits: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Make the next `count` commits fail as if the connection dropped.
    pub(crate) fn fail_next_commits(&self, count: u32) {
        self.failing_commits.store(count, Ordering::SeqCst);
    }

    /// Insert a ticket in any status, bypassing the reservation path.
    pub(crate) async fn seed_ticket(
        &self,
        ticket_type_id: i64,
        user_id: i64,
        code: &str,
        status: TicketStatus,
    ) -> Ticket {
        let mut tables = self.tables.lock().await;
        let event_id = tables
            .ticket_types
            .get(&ticket_type_id)
            .map_or(0, |tt| tt.event_id);

        tables.last_ticket_id += 1;
        let now = Utc::now();
        let ticket = Ticket {
            id: tables.last_ticket_id,
            event_id,
            ticket_type_id,
            user_id,
            code: TicketCode::new(code),
            status,
            created_at: now,
            updated_at: now,
        };
        tables.tickets.insert(ticket.id, ticket.clone());
        ticket
    }

    pub(crate) async fn all_tickets(&self) -> Vec<Ticket> {
        self.tables.lock().await.tickets.values().cloned().collect()
    }

    async fn row_mutex(&self, key: &RowKey) -> Arc<Mutex<()>> {
        let mut locks = self.row_locks.lock().await;
        locks.entry(key.clone()).or_default().clone()
    }
}

#[async_trait]
impl TicketingDatabase for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        Ok(Box::new(InMemoryUnitOfWork {
            store: self.clone(),
            guards: Vec::new(),
            locked: HashSet::new(),
            pending: Vec::new(),
            finished: false,
        }))
    }

    async fn create_ticket_type(&self, new: NewTicketType) -> Result<TicketType, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.last_ticket_type_id += 1;

        let now = Utc::now();
        let ticket_type = TicketType {
            id: tables.last_ticket_type_id,
            event_id: new.event_id,
            kind: new.kind,
            price: new.price,
            quantity: new.quantity,
            sold: 0,
            sales_start: new.sales_start,
            sales_end: new.sales_end,
            created_at: now,
            updated_at: now,
        };
        tables.ticket_types.insert(ticket_type.id, ticket_type.clone());
        Ok(ticket_type)
    }

    async fn get_ticket_type(&self, id: i64) -> Result<Option<TicketType>, StoreError> {
        Ok(self.tables.lock().await.ticket_types.get(&id).cloned())
    }

    async fn list_tickets(&self, filter: &TicketListFilter) -> Result<Vec<Ticket>, StoreError> {
        let tables = self.tables.lock().await;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();

        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(tickets
            .into_iter()
            .skip(filter.effective_offset() as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn active_ticket_exists(&self, code: &str) -> Result<bool, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tickets
            .values()
            .any(|t| t.code.as_str() == code && t.status == TicketStatus::Active))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

enum Pending {
    IncrementSold(i64),
    Insert(Ticket),
    MarkUsed(i64),
}

struct InMemoryUnitOfWork {
    store: InMemoryStore,
    guards: Vec<OwnedMutexGuard<()>>,
    locked: HashSet<RowKey>,
    pending: Vec<Pending>,
    finished: bool,
}

impl InMemoryUnitOfWork {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.finished {
            Err(StoreError::TransactionClosed)
        } else {
            Ok(())
        }
    }

    async fn lock_row(&mut self, key: RowKey) -> Result<(), StoreError> {
        if self.locked.contains(&key) {
            return Ok(());
        }

        let mutex = self.store.row_mutex(&key).await;
        let guard = tokio::time::timeout(self.store.lock_timeout, mutex.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)?;

        self.guards.push(guard);
        self.locked.insert(key);
        Ok(())
    }

    fn pending_increments(&self, id: i64) -> i32 {
        self.pending
            .iter()
            .filter(|p| matches!(p, Pending::IncrementSold(pid) if *pid == id))
            .count() as i32
    }

    fn release(&mut self) {
        self.pending.clear();
        self.guards.clear();
        self.locked.clear();
        self.finished = true;
    }
}

#[async_trait]
impl InventoryLedger for InMemoryUnitOfWork {
    async fn lock_ticket_type(&mut self, id: i64) -> Result<Option<TicketType>, StoreError> {
        self.ensure_open()?;
        self.lock_row(RowKey::TicketType(id)).await?;

        let tables = self.store.tables.lock().await;
        Ok(tables.ticket_types.get(&id).cloned().map(|mut tt| {
            tt.sold += self.pending_increments(id);
            tt
        }))
    }

    async fn increment_sold(&mut self, id: i64) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.lock_row(RowKey::TicketType(id)).await?;

        let within_capacity = {
            let tables = self.store.tables.lock().await;
            tables
                .ticket_types
                .get(&id)
                .is_some_and(|tt| tt.sold + self.pending_increments(id) < tt.quantity)
        };

        if !within_capacity {
            return Err(StoreError::CapacityExceeded(id));
        }

        self.pending.push(Pending::IncrementSold(id));
        Ok(())
    }
}

#[async_trait]
impl TicketStore for InMemoryUnitOfWork {
    async fn insert_ticket(&mut self, new: NewTicket) -> Result<Ticket, StoreError> {
        self.ensure_open()?;

        let pending_has_code = self
            .pending
            .iter()
            .any(|p| matches!(p, Pending::Insert(t) if t.code == new.code));

        let ticket = {
            let mut tables = self.store.tables.lock().await;
            if pending_has_code || tables.tickets.values().any(|t| t.code == new.code) {
                return Err(StoreError::DuplicateCode);
            }

            tables.last_ticket_id += 1;
            Ticket {
                id: tables.last_ticket_id,
                event_id: new.event_id,
                ticket_type_id: new.ticket_type_id,
                user_id: new.user_id,
                code: new.code,
                status: TicketStatus::Active,
                created_at: new.created_at,
                updated_at: new.created_at,
            }
        };

        self.pending.push(Pending::Insert(ticket.clone()));
        Ok(ticket)
    }

    async fn lock_active_ticket(&mut self, code: &str) -> Result<Option<Ticket>, StoreError> {
        self.ensure_open()?;
        self.lock_row(RowKey::TicketCode(code.to_string())).await?;

        let tables = self.store.tables.lock().await;
        Ok(tables
            .tickets
            .values()
            .find(|t| t.code.as_str() == code && t.status == TicketStatus::Active)
            .cloned())
    }

    async fn mark_used(&mut self, ticket_id: i64) -> Result<Option<Ticket>, StoreError> {
        self.ensure_open()?;

        let already_pending = self
            .pending
            .iter()
            .any(|p| matches!(p, Pending::MarkUsed(id) if *id == ticket_id));
        if already_pending {
            return Ok(None);
        }

        let used = {
            let tables = self.store.tables.lock().await;
            tables
                .tickets
                .get(&ticket_id)
                .filter(|t| t.status == TicketStatus::Active)
                .cloned()
                .map(|mut t| {
                    t.status = TicketStatus::Used;
                    t.updated_at = Utc::now();
                    t
                })
        };

        if used.is_some() {
            self.pending.push(Pending::MarkUsed(ticket_id));
        }
        Ok(used)
    }
}

fn validate_pending(tables: &Tables, pending: &[Pending]) -> Result<(), StoreError> {
    let mut increments: HashMap<i64, i32> = HashMap::new();

    for write in pending {
        match write {
            Pending::IncrementSold(id) => *increments.entry(*id).or_default() += 1,
            Pending::Insert(ticket) => {
                if tables.tickets.values().any(|t| t.code == ticket.code) {
                    return Err(StoreError::DuplicateCode);
                }
            }
            Pending::MarkUsed(_) => {}
        }
    }

    for (id, count) in increments {
        let fits = tables
            .ticket_types
            .get(&id)
            .is_some_and(|tt| tt.sold + count <= tt.quantity);
        if !fits {
            return Err(StoreError::CapacityExceeded(id));
        }
    }
    Ok(())
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;

        let injected_failure = self
            .store
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected_failure {
            self.release();
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }

        let store = self.store.clone();
        let mut tables = store.tables.lock().await;

        // Validate everything first so a failed commit leaves no trace.
        if let Err(error) = validate_pending(&tables, &self.pending) {
            drop(tables);
            self.release();
            return Err(error);
        }

        let now = Utc::now();
        for write in self.pending.drain(..) {
            match write {
                Pending::IncrementSold(id) => {
                    if let Some(tt) = tables.ticket_types.get_mut(&id) {
                        tt.sold += 1;
                        tt.updated_at = now;
                    }
                }
                Pending::Insert(ticket) => {
                    tables.tickets.insert(ticket.id, ticket);
                }
                Pending::MarkUsed(id) => {
                    if let Some(t) = tables.tickets.get_mut(&id) {
                        t.status = TicketStatus::Used;
                        t.updated_at = now;
                    }
                }
            }
        }

        drop(tables);
        self.release();
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.release();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ticketing::TicketKind;
    use chrono::Duration as ChronoDuration;

    async fn store_with_type(quantity: i32) -> (InMemoryStore, TicketType) {
        let store = InMemoryStore::with_lock_timeout(Duration::from_millis(200));
        let now = Utc::now();
        let tt = store
            .create_ticket_type(NewTicketType {
                event_id: 1,
                kind: TicketKind::Standard,
                price: 100,
                quantity,
                sales_start: now - ChronoDuration::hours(1),
                sales_end: now + ChronoDuration::hours(1),
            })
            .await
            .unwrap();
        (store, tt)
    }

    fn new_ticket(tt: &TicketType, code: &str) -> NewTicket {
        NewTicket {
            event_id: tt.event_id,
            ticket_type_id: tt.id,
            user_id: 9,
            code: TicketCode::new(code),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_writes_invisible_until_commit() {
        let (store, tt) = store_with_type(2).await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_ticket_type(tt.id).await.unwrap();
        uow.increment_sold(tt.id).await.unwrap();
        uow.insert_ticket(new_ticket(&tt, "A")).await.unwrap();

        assert_eq!(store.get_ticket_type(tt.id).await.unwrap().unwrap().sold, 0);
        assert!(!store.active_ticket_exists("A").await.unwrap());

        uow.commit().await.unwrap();

        assert_eq!(store.get_ticket_type(tt.id).await.unwrap().unwrap().sold, 1);
        assert!(store.active_ticket_exists("A").await.unwrap());
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let (store, tt) = store_with_type(2).await;

        let mut uow = store.begin().await.unwrap();
        uow.lock_ticket_type(tt.id).await.unwrap();
        uow.increment_sold(tt.id).await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(store.get_ticket_type(tt.id).await.unwrap().unwrap().sold, 0);
        assert!(matches!(uow.commit().await, Err(StoreError::TransactionClosed)));
    }

    #[tokio::test]
    async fn test_second_locker_waits_then_times_out() {
        let (store, tt) = store_with_type(2).await;

        let mut first = store.begin().await.unwrap();
        first.lock_ticket_type(tt.id).await.unwrap();

        let mut second = store.begin().await.unwrap();
        let result = second.lock_ticket_type(tt.id).await;
        assert!(matches!(result, Err(StoreError::LockTimeout)));
    }

    #[tokio::test]
    async fn test_dropping_unit_of_work_releases_lock() {
        let (store, tt) = store_with_type(2).await;

        {
            let mut first = store.begin().await.unwrap();
            first.lock_ticket_type(tt.id).await.unwrap();
            first.increment_sold(tt.id).await.unwrap();
        }

        let mut second = store.begin().await.unwrap();
        let locked = second.lock_ticket_type(tt.id).await.unwrap().unwrap();
        assert_eq!(locked.sold, 0);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected_even_for_used_ticket() {
        let (store, tt) = store_with_type(5).await;
        store.seed_ticket(tt.id, 1, "TAKEN", TicketStatus::Used).await;

        let mut uow = store.begin().await.unwrap();
        let result = uow.insert_ticket(new_ticket(&tt, "TAKEN")).await;
        assert!(matches!(result, Err(StoreError::DuplicateCode)));
    }

    #[tokio::test]
    async fn test_increment_refused_at_capacity() {
        let (store, tt) = store_with_type(1).await;

        let mut uow = store.begin().await.unwrap();
        uow.increment_sold(tt.id).await.unwrap();
        assert!(matches!(
            uow.increment_sold(tt.id).await,
            Err(StoreError::CapacityExceeded(_))
        ));
    }

    #[tokio::test]
    async fn test_blocked_checkin_sees_committed_status() {
        let (store, tt) = store_with_type(1).await;
        let ticket = store.seed_ticket(tt.id, 1, "DOOR", TicketStatus::Active).await;

        let mut first = store.begin().await.unwrap();
        first.lock_active_ticket("DOOR").await.unwrap().unwrap();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                let mut second = store.begin().await.unwrap();
                second.lock_active_ticket("DOOR").await.unwrap()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        first.mark_used(ticket.id).await.unwrap().unwrap();
        first.commit().await.unwrap();

        assert!(waiter.await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_pages() {
        let (store, tt) = store_with_type(10).await;
        for code in ["a", "b", "c"] {
            store.seed_ticket(tt.id, 1, code, TicketStatus::Active).await;
        }
        store.seed_ticket(tt.id, 2, "d", TicketStatus::Used).await;

        let page = store
            .list_tickets(&TicketListFilter {
                user_id: Some(1),
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        let codes: Vec<_> = page.iter().map(|t| t.code.as_str().to_string()).collect();
        assert_eq!(codes, vec!["c", "b"]);

        let used = store
            .list_tickets(&TicketListFilter {
                status: Some(TicketStatus::Used),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(used.len(), 1);
    }
}
