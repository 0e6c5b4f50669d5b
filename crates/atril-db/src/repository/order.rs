//! # Order Repository
//!
//! Database operations for orders, their book lines and their payments.
//!
//! ## Storage Layout
//! ```text
//! orders ─┬─< book_lines   (position keeps insertion order; state mutable)
//!         └─< payments     (append-only)
//! ```
//!
//! ## Writes
//! `update` persists an order that was loaded, mutated by `atril-core`, and
//! handed back. The `orders` row is updated only if its `sync_version` still
//! matches what was loaded; new lines and payments are inserted, existing
//! lines get their state rewritten. Line titles, prices and payments are
//! never rewritten.

use std::collections::HashMap;

use atril_core::{title_key, BookLine, CoreError, FulfillmentState, Money, Order, Payment};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    customer_name: String,
    phone: String,
    created_at: DateTime<Utc>,
    tentative_arrival: Option<NaiveDate>,
    sync_version: i64,
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: String,
    order_id: String,
    title: String,
    unit_price_cents: i64,
    state: FulfillmentState,
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: String,
    order_id: String,
    amount_cents: i64,
    paid_at: DateTime<Utc>,
    note: String,
}

impl From<LineRow> for BookLine {
    fn from(row: LineRow) -> Self {
        BookLine {
            id: row.id,
            title: row.title,
            unit_price: Money::from_cents(row.unit_price_cents),
            state: row.state,
        }
    }
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            amount: Money::from_cents(row.amount_cents),
            paid_at: row.paid_at,
            note: row.note,
        }
    }
}

impl OrderRow {
    fn into_order(self, lines: Vec<BookLine>, payments: Vec<Payment>) -> Order {
        Order {
            id: self.id,
            customer_name: self.customer_name,
            phone: self.phone,
            created_at: self.created_at,
            tentative_arrival: self.tentative_arrival,
            lines,
            payments,
            sync_version: self.sync_version,
        }
    }
}

const ORDER_COLUMNS: &str =
    "id, customer_name, phone, created_at, tentative_arrival, sync_version";
const LINE_COLUMNS: &str = "id, order_id, title, unit_price_cents, state";
const PAYMENT_COLUMNS: &str = "id, order_id, amount_cents, paid_at, note";

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.orders();
///
/// let all = repo.list().await?;
/// let order = repo.require("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Lists every order with its lines and payments, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at, rowid"
        ))
        .fetch_all(&self.pool)
        .await?;

        let lines: Vec<LineRow> = sqlx::query_as(&format!(
            "SELECT {LINE_COLUMNS} FROM book_lines ORDER BY order_id, position"
        ))
        .fetch_all(&self.pool)
        .await?;

        let payments: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments ORDER BY order_id, position"
        ))
        .fetch_all(&self.pool)
        .await?;

        let orders = assemble(rows, lines, payments);
        debug!(count = orders.len(), "Loaded orders");
        Ok(orders)
    }

    /// Lists the orders holding at least one line of `title` (matched
    /// case-insensitively) in `state`, oldest first.
    ///
    /// ## Usage
    /// Stock intake and mark-as-ordered only ever touch such orders, so they
    /// load this subset instead of the whole ledger.
    pub async fn list_with_title_in_state(
        &self,
        title: &str,
        state: FulfillmentState,
    ) -> DbResult<Vec<Order>> {
        let key = title_key(title);

        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE id IN (SELECT order_id FROM book_lines WHERE title_key = ?1 AND state = ?2)
             ORDER BY created_at, rowid"
        ))
        .bind(&key)
        .bind(state)
        .fetch_all(&self.pool)
        .await?;

        let lines: Vec<LineRow> = sqlx::query_as(&format!(
            "SELECT {LINE_COLUMNS} FROM book_lines
             WHERE order_id IN (SELECT order_id FROM book_lines WHERE title_key = ?1 AND state = ?2)
             ORDER BY order_id, position"
        ))
        .bind(&key)
        .bind(state)
        .fetch_all(&self.pool)
        .await?;

        let payments: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments
             WHERE order_id IN (SELECT order_id FROM book_lines WHERE title_key = ?1 AND state = ?2)
             ORDER BY order_id, position"
        ))
        .bind(&key)
        .bind(state)
        .fetch_all(&self.pool)
        .await?;

        let orders = assemble(rows, lines, payments);
        debug!(title = %title, state = %state, count = orders.len(), "Loaded matching orders");
        Ok(orders)
    }

    /// Gets an order by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Order))` - Order found
    /// * `Ok(None)` - Order not found
    pub async fn get(&self, id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<LineRow> = sqlx::query_as(&format!(
            "SELECT {LINE_COLUMNS} FROM book_lines WHERE order_id = ?1 ORDER BY position"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let payments: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1 ORDER BY position"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.into_order(
            lines.into_iter().map(BookLine::from).collect(),
            payments.into_iter().map(Payment::from).collect(),
        )))
    }

    /// Like [`get`](Self::get), but a missing order is an error.
    pub async fn require(&self, id: &str) -> DbResult<Order> {
        self.get(id)
            .await?
            .ok_or_else(|| DbError::Core(CoreError::OrderNotFound(id.to_string())))
    }

    /// Counts orders.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Inserts a new order with its lines and payments in one transaction.
    pub async fn insert(&self, order: &Order) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Self::insert_in(&mut *tx, order).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(order_id = %order.id, lines = order.lines.len(), "Order inserted");
        Ok(())
    }

    /// Persists a mutated order. Returns it with the bumped `sync_version`.
    ///
    /// ## Errors
    /// - `Conflict` if the order changed since it was loaded
    /// - `NotFound` if it no longer exists
    pub async fn update(&self, order: &Order) -> DbResult<Order> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let version = Self::save_in(&mut *tx, order).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut saved = order.clone();
        saved.sync_version = version;
        Ok(saved)
    }

    // =========================================================================
    // Connection-level helpers (usable inside a caller's transaction)
    // =========================================================================

    /// Inserts the order row, its lines and its payments on `conn`.
    pub(crate) async fn insert_in(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO orders
                (id, customer_name, phone, created_at, tentative_arrival, updated_at, sync_version)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(order.created_at)
        .bind(order.tentative_arrival)
        .bind(now)
        .bind(order.sync_version)
        .execute(&mut *conn)
        .await?;

        write_children(conn, order).await
    }

    /// Writes back a loaded-then-mutated order on `conn`.
    ///
    /// Returns the new `sync_version`.
    pub(crate) async fn save_in(conn: &mut SqliteConnection, order: &Order) -> DbResult<i64> {
        let result = sqlx::query(
            "UPDATE orders
             SET customer_name = ?1,
                 phone = ?2,
                 tentative_arrival = ?3,
                 updated_at = ?4,
                 sync_version = sync_version + 1
             WHERE id = ?5 AND sync_version = ?6",
        )
        .bind(&order.customer_name)
        .bind(&order.phone)
        .bind(order.tentative_arrival)
        .bind(Utc::now())
        .bind(&order.id)
        .bind(order.sync_version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let current: Option<i64> =
                sqlx::query_scalar("SELECT sync_version FROM orders WHERE id = ?1")
                    .bind(&order.id)
                    .fetch_optional(&mut *conn)
                    .await?;

            return Err(match current {
                Some(_) => DbError::conflict("Order", &order.id, order.sync_version),
                None => DbError::not_found("Order", &order.id),
            });
        }

        write_children(conn, order).await?;

        debug!(
            order_id = %order.id,
            version = order.sync_version + 1,
            "Order saved"
        );
        Ok(order.sync_version + 1)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Upserts lines (state only on conflict) and appends unseen payments.
async fn write_children(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    for (position, line) in order.lines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO book_lines
                (id, order_id, position, title, title_key, unit_price_cents, state)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET state = excluded.state",
        )
        .bind(&line.id)
        .bind(&order.id)
        .bind(position as i64)
        .bind(&line.title)
        .bind(title_key(&line.title))
        .bind(line.unit_price.cents())
        .bind(line.state)
        .execute(&mut *conn)
        .await?;
    }

    for (position, payment) in order.payments.iter().enumerate() {
        sqlx::query(
            "INSERT INTO payments (id, order_id, position, amount_cents, paid_at, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO NOTHING",
        )
        .bind(&payment.id)
        .bind(&order.id)
        .bind(position as i64)
        .bind(payment.amount.cents())
        .bind(payment.paid_at)
        .bind(&payment.note)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Stitches order rows and their children together, keeping row order.
fn assemble(rows: Vec<OrderRow>, lines: Vec<LineRow>, payments: Vec<PaymentRow>) -> Vec<Order> {
    let mut lines_by_order: HashMap<String, Vec<BookLine>> = HashMap::new();
    for row in lines {
        lines_by_order
            .entry(row.order_id.clone())
            .or_default()
            .push(row.into());
    }

    let mut payments_by_order: HashMap<String, Vec<Payment>> = HashMap::new();
    for row in payments {
        payments_by_order
            .entry(row.order_id.clone())
            .or_default()
            .push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let lines = lines_by_order.remove(&row.id).unwrap_or_default();
            let payments = payments_by_order.remove(&row.id).unwrap_or_default();
            row.into_order(lines, payments)
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
