use async_trait::async_trait;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::{Executor, Postgres, QueryBuilder, Row, Transaction};
use std::time::Duration;

use super::{InventoryLedger, StoreError, TicketStore, TicketingDatabase, UnitOfWork};
use crate::config::DatabaseConfig;
use crate::domain::ticketing::{
    NewTicket, NewTicketType, Ticket, TicketCode, TicketListFilter, TicketStatus, TicketType,
};

// ============================================================================
// PostgreSQL Ticketing Store
// ============================================================================
//
// Row locks are explicit locking reads (`SELECT ... FOR UPDATE`) inside one
// transaction per unit of work. Under READ COMMITTED a blocked locking read
// re-evaluates its WHERE clause against the row version committed by the
// lock holder, which is what makes a redeemed code invisible to a second
// check-in.
//
// ============================================================================

const SCHEMA: &str = include_str!("../../migrations/0001_ticketing.sql");

const UNIQUE_VIOLATION: &str = "23505";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const CODE_UNIQUE_CONSTRAINT: &str = "tickets_code_key";

/// Map a Postgres SQLSTATE (and constraint name) onto a store error.
fn classify(code: Option<&str>, constraint: Option<&str>) -> Option<StoreError> {
    match (code, constraint) {
        (Some(UNIQUE_VIOLATION), Some(CODE_UNIQUE_CONSTRAINT)) => Some(StoreError::DuplicateCode),
        (Some(LOCK_NOT_AVAILABLE), _) => Some(StoreError::LockTimeout),
        _ => None,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let classified = match &err {
            sqlx::Error::Database(db) => classify(db.code().as_deref(), db.constraint()),
            _ => None,
        };
        classified.unwrap_or(StoreError::Database(err))
    }
}

fn ticket_type_from_row(row: &PgRow) -> Result<TicketType, StoreError> {
    let kind: String = row.try_get("kind")?;

    Ok(TicketType {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        kind: kind.parse().map_err(StoreError::CorruptRow)?,
        price: row.try_get("price")?,
        quantity: row.try_get("quantity")?,
        sold: row.try_get("sold")?,
        sales_start: row.try_get("sales_start")?,
        sales_end: row.try_get("sales_end")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn ticket_from_row(row: &PgRow) -> Result<Ticket, StoreError> {
    let status: String = row.try_get("status")?;
    let code: String = row.try_get("code")?;

    Ok(Ticket {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        ticket_type_id: row.try_get("ticket_type_id")?,
        user_id: row.try_get("user_id")?,
        code: TicketCode::new(code),
        status: status.parse().map_err(StoreError::CorruptRow)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[derive(Clone)]
pub struct PgTicketingStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgTicketingStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.url)
            .await?;

        tracing::info!(max_connections = config.max_connections, "Connected to PostgreSQL");

        Ok(Self::new(pool, config.lock_timeout))
    }

    /// Create tables, constraints and indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("Ticketing schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl TicketingDatabase for PgTicketingStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters; the value is an integer we own.
        let statement = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout.as_millis());
        (&mut *tx).execute(statement.as_str()).await?;

        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }

    async fn create_ticket_type(&self, new: NewTicketType) -> Result<TicketType, StoreError> {
        let row = sqlx::query(
            "INSERT INTO ticket_types (event_id, kind, price, quantity, sold, sales_start, sales_end)
             VALUES ($1, $2, $3, $4, 0, $5, $6)
             RETURNING id, event_id, kind, price, quantity, sold, sales_start, sales_end,
                       created_at, updated_at",
        )
        .bind(new.event_id)
        .bind(new.kind.as_str())
        .bind(new.price)
        .bind(new.quantity)
        .bind(new.sales_start)
        .bind(new.sales_end)
        .fetch_one(&self.pool)
        .await?;

        ticket_type_from_row(&row)
    }

    async fn get_ticket_type(&self, id: i64) -> Result<Option<TicketType>, StoreError> {
        let row = sqlx::query(
            "SELECT id, event_id, kind, price, quantity, sold, sales_start, sales_end,
                    created_at, updated_at
             FROM ticket_types
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(ticket_type_from_row).transpose()
    }

    async fn list_tickets(&self, filter: &TicketListFilter) -> Result<Vec<Ticket>, StoreError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, event_id, ticket_type_id, user_id, code, status, created_at, updated_at
             FROM tickets WHERE TRUE",
        );

        if let Some(event_id) = filter.event_id {
            query.push(" AND event_id = ").push_bind(event_id);
        }
        if let Some(user_id) = filter.user_id {
            query.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(filter.effective_limit())
            .push(" OFFSET ")
            .push_bind(filter.effective_offset());

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn active_ticket_exists(&self, code: &str) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM tickets WHERE code = $1 AND status = 'active')",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get::<bool, _>(0)?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ============================================================================
// Unit of Work - one PostgreSQL transaction
// ============================================================================

struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> Result<&mut PgConnection, StoreError> {
        self.tx.as_deref_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl InventoryLedger for PgUnitOfWork {
    async fn lock_ticket_type(&mut self, id: i64) -> Result<Option<TicketType>, StoreError> {
        let row = sqlx::query(
            "SELECT id, event_id, kind, price, quantity, sold, sales_start, sales_end,
                    created_at, updated_at
             FROM ticket_types
             WHERE id = $1
             FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(self.conn()?)
        .await?;

        row.as_ref().map(ticket_type_from_row).transpose()
    }

    async fn increment_sold(&mut self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE ticket_types
             SET sold = sold + 1, updated_at = now()
             WHERE id = $1 AND sold < quantity",
        )
        .bind(id)
        .execute(self.conn()?)
        .await?;

        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(StoreError::CapacityExceeded(id))
        }
    }
}

#[async_trait]
impl TicketStore for PgUnitOfWork {
    async fn insert_ticket(&mut self, ticket: NewTicket) -> Result<Ticket, StoreError> {
        let row = sqlx::query(
            "INSERT INTO tickets (event_id, ticket_type_id, user_id, code, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6)
             RETURNING id, event_id, ticket_type_id, user_id, code, status, created_at, updated_at",
        )
        .bind(ticket.event_id)
        .bind(ticket.ticket_type_id)
        .bind(ticket.user_id)
        .bind(ticket.code.as_str())
        .bind(TicketStatus::Active.as_str())
        .bind(ticket.created_at)
        .fetch_one(self.conn()?)
        .await?;

        ticket_from_row(&row)
    }

    async fn lock_active_ticket(&mut self, code: &str) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query(
            "SELECT id, event_id, ticket_type_id, user_id, code, status, created_at, updated_at
             FROM tickets
             WHERE code = $1 AND status = 'active'
             FOR UPDATE",
        )
        .bind(code)
        .fetch_optional(self.conn()?)
        .await?;

        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn mark_used(&mut self, ticket_id: i64) -> Result<Option<Ticket>, StoreError> {
        let row = sqlx::query(
            "UPDATE tickets
             SET status = 'used', updated_at = now()
             WHERE id = $1 AND status = 'active'
             RETURNING id, event_id, ticket_type_id, user_id, code, status, created_at, updated_at",
        )
        .bind(ticket_id)
        .fetch_optional(self.conn()?)
        .await?;

        row.as_ref().map(ticket_from_row).transpose()
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
