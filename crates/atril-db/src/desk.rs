//! # Order Desk
//!
//! The single entry point for everything that changes the ledger.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  desk.stock_intake("Naturales 1", 3, New)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  write_lock.lock()  ← one writer at a time                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load orders + stock          (repositories)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  reconcile_stock_intake(..)   (atril-core, pure)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN; save orders (sync_version checked); upsert stock; COMMIT        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock released                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two intakes of the same title can never hand the same line out twice, and
//! a manual state change can never interleave with an intake's read and
//! write. The `sync_version` check catches writers outside this process.
//!
//! Reads go straight to the repositories and take no lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use atril_core::intake::adjust_stock;
use atril_core::notify::{whatsapp_link, NotifyConfig};
use atril_core::orders::new_line_from_input;
use atril_core::{
    aggregate_open_lines_by_title_and_state, mark_title_on_order, open_order,
    reconcile_stock_intake, BoardGroup, BookCondition, CoreResult, FulfillmentState,
    IntakeOutcome, LineRef, Money, NewBookLine, NewOrder, Order, OrderSummary, StockEntry,
    DEFAULT_PAYMENT_NOTE,
};
use sqlx::{Sqlite, Transaction};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::AtrilConfig;
use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::order::OrderRepository;
use crate::repository::stock::StockRepository;

/// Serialized access to the order ledger.
///
/// Cheap to clone; clones share the same write lock.
#[derive(Debug, Clone)]
pub struct OrderDesk {
    db: Database,
    write_lock: Arc<Mutex<()>>,
    notify: NotifyConfig,
    default_payment_note: String,
}

impl OrderDesk {
    /// Creates a desk with default notification and payment settings.
    pub fn new(db: Database) -> Self {
        OrderDesk {
            db,
            write_lock: Arc::new(Mutex::new(())),
            notify: NotifyConfig::default(),
            default_payment_note: DEFAULT_PAYMENT_NOTE.to_string(),
        }
    }

    /// Creates a desk using the loaded configuration.
    pub fn with_config(db: Database, config: &AtrilConfig) -> Self {
        OrderDesk {
            notify: config.notify.clone(),
            default_payment_note: config.default_payment_note.clone(),
            ..OrderDesk::new(db)
        }
    }

    /// The underlying database, for catalog maintenance and diagnostics.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// All orders, oldest first.
    pub async fn orders(&self) -> DbResult<Vec<Order>> {
        self.db.orders().list().await
    }

    /// One order, or `NotFound`.
    pub async fn order(&self, order_id: &str) -> DbResult<Order> {
        self.db.orders().require(order_id).await
    }

    /// The derived ledger view of one order.
    pub async fn summary(&self, order_id: &str) -> DbResult<OrderSummary> {
        Ok(self.order(order_id).await?.summary())
    }

    /// The kanban board of every open line.
    pub async fn board(&self) -> DbResult<Vec<BoardGroup>> {
        let orders = self.orders().await?;
        Ok(aggregate_open_lines_by_title_and_state(&orders))
    }

    /// Free stock entries.
    pub async fn stock(&self) -> DbResult<Vec<StockEntry>> {
        self.db.stock().list().await
    }

    /// WhatsApp link telling the customer which books are ready.
    ///
    /// `Ok(None)` when the order has no usable phone or nothing `InStore`.
    pub async fn notification_link(&self, order_id: &str) -> DbResult<Option<String>> {
        let order = self.order(order_id).await?;
        let link = whatsapp_link(&order, &self.notify);
        if link.is_none() {
            debug!(order_id = %order_id, "No notification link for order");
        }
        Ok(link)
    }

    // =========================================================================
    // Order Writes
    // =========================================================================

    /// Takes a new order at the counter.
    pub async fn open_order(&self, new_order: NewOrder) -> DbResult<Order> {
        let order = open_order(new_order)?;

        let _guard = self.write_lock.lock().await;
        self.db.orders().insert(&order).await?;

        info!(
            order_id = %order.id,
            customer = %order.customer_name,
            lines = order.lines.len(),
            deposit = %order.total_paid(),
            "Order opened"
        );
        Ok(order)
    }

    /// Opens an order pre-filled with every book of a catalog grade, at the
    /// catalog's current prices.
    pub async fn open_order_for_grade(
        &self,
        customer_name: &str,
        phone: &str,
        grade_id: &str,
        deposit: Option<Money>,
    ) -> DbResult<Order> {
        let grade = self
            .db
            .catalog()
            .get_grade(grade_id)
            .await?
            .ok_or_else(|| DbError::not_found("Grade", grade_id))?;

        self.open_order(NewOrder {
            customer_name: customer_name.to_string(),
            phone: phone.to_string(),
            lines: grade.to_new_lines(),
            deposit,
            tentative_arrival: None,
        })
        .await
    }

    /// Records a payment. A blank note gets the configured default.
    pub async fn add_payment(&self, order_id: &str, amount: Money, note: &str) -> DbResult<Order> {
        let note = if note.trim().is_empty() {
            self.default_payment_note.as_str()
        } else {
            note
        };

        let (order, payment_id) = self
            .mutate_order(order_id, |order| {
                order.add_payment(amount, note).map(|p| p.id.clone())
            })
            .await?;

        info!(
            order_id = %order_id,
            payment_id = %payment_id,
            amount = %amount,
            debt = %order.debt(),
            "Payment recorded"
        );
        Ok(order)
    }

    /// Appends books to an order; each starts `Missing`.
    pub async fn add_lines(&self, order_id: &str, lines: Vec<NewBookLine>) -> DbResult<Order> {
        let count = lines.len();
        let (order, ()) = self
            .mutate_order(order_id, move |order| order.add_lines(lines).map(|_| ()))
            .await?;

        info!(order_id = %order_id, added = count, "Lines added");
        Ok(order)
    }

    /// Appends one book typed by the operator. An unparsable price is zero.
    pub async fn add_line_from_input(
        &self,
        order_id: &str,
        title: &str,
        price_input: &str,
    ) -> DbResult<Order> {
        let line = new_line_from_input(title, price_input)?;
        if Money::parse_decimal(price_input).is_none() && !price_input.trim().is_empty() {
            warn!(order_id = %order_id, input = %price_input, "Unparsable price stored as zero");
        }
        self.add_lines(order_id, vec![line]).await
    }

    /// Operator override of one line's fulfillment state.
    pub async fn set_line_state(
        &self,
        order_id: &str,
        line_id: &str,
        state: FulfillmentState,
    ) -> DbResult<Order> {
        let (order, previous) = self
            .mutate_order(order_id, |order| order.set_line_state(line_id, state))
            .await?;

        info!(
            order_id = %order_id,
            line_id = %line_id,
            from = %previous,
            to = %state,
            "Line state changed"
        );
        Ok(order)
    }

    // =========================================================================
    // Bulk Writes
    // =========================================================================

    /// Records newly arrived copies: waiting orders first (oldest first),
    /// the rest to free stock. All writes commit together.
    pub async fn stock_intake(
        &self,
        title: &str,
        quantity: i64,
        condition: BookCondition,
    ) -> DbResult<IntakeOutcome> {
        let _guard = self.write_lock.lock().await;

        let mut orders = self
            .db
            .orders()
            .list_with_title_in_state(title, FulfillmentState::Missing)
            .await?;
        let mut stock: Vec<StockEntry> = self
            .db
            .stock()
            .find(title, condition)
            .await?
            .into_iter()
            .collect();

        let outcome = reconcile_stock_intake(&mut orders, &mut stock, title, quantity, condition)?;

        let mut tx = self.begin().await?;
        save_touched(&mut tx, &orders, &outcome.assigned).await?;
        if let Some(entry) = &outcome.stock_entry {
            StockRepository::upsert_in(&mut *tx, entry).await?;
        }
        commit(tx).await?;

        info!(
            title = %title,
            condition = %condition,
            quantity,
            assigned = outcome.assigned_count,
            to_stock = outcome.remainder_to_stock,
            "Stock intake recorded"
        );
        Ok(outcome)
    }

    /// Marks every `Missing` line of `title` as requested from the
    /// distributor.
    pub async fn mark_title_on_order(&self, title: &str) -> DbResult<Vec<LineRef>> {
        let _guard = self.write_lock.lock().await;

        let mut orders = self
            .db
            .orders()
            .list_with_title_in_state(title, FulfillmentState::Missing)
            .await?;

        let touched = mark_title_on_order(&mut orders, title)?;

        let mut tx = self.begin().await?;
        save_touched(&mut tx, &orders, &touched).await?;
        commit(tx).await?;

        info!(title = %title, lines = touched.len(), "Title marked as ordered");
        Ok(touched)
    }

    /// Sets a shelf count by hand. The count is absolute and non-negative.
    pub async fn adjust_stock(
        &self,
        title: &str,
        condition: BookCondition,
        quantity: i64,
    ) -> DbResult<StockEntry> {
        let _guard = self.write_lock.lock().await;

        let mut stock: Vec<StockEntry> = self
            .db
            .stock()
            .find(title, condition)
            .await?
            .into_iter()
            .collect();
        let previous = stock.first().map(|e| e.quantity).unwrap_or(0);

        let entry = adjust_stock(&mut stock, title, condition, quantity)?;
        self.db.stock().upsert(&entry).await?;

        info!(
            title = %title,
            condition = %condition,
            from = previous,
            to = quantity,
            "Stock adjusted"
        );
        Ok(entry)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// load → `op` → save, under the write lock. Nothing is written when
    /// `op` fails.
    async fn mutate_order<T>(
        &self,
        order_id: &str,
        op: impl FnOnce(&mut Order) -> CoreResult<T>,
    ) -> DbResult<(Order, T)> {
        let _guard = self.write_lock.lock().await;

        let mut order = self.db.orders().require(order_id).await?;
        let output = op(&mut order)?;
        let order = self.db.orders().update(&order).await?;

        Ok((order, output))
    }

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.db
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

/// Saves each order referenced by `touched` once.
async fn save_touched(
    tx: &mut Transaction<'static, Sqlite>,
    orders: &[Order],
    touched: &[LineRef],
) -> DbResult<()> {
    let ids: BTreeSet<&str> = touched.iter().map(|r| r.order_id.as_str()).collect();
    for order in orders.iter().filter(|o| ids.contains(o.id.as_str())) {
        OrderRepository::save_in(&mut **tx, order).await?;
    }
    Ok(())
}

async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbConfig;
    use chrono::{Duration, Utc};

    async fn setup() -> OrderDesk {
        OrderDesk::new(Database::new(DbConfig::in_memory()).await.unwrap())
    }

    fn pesos(units: i64) -> Money {
        Money::from_major_minor(units, 0)
    }

    fn new_order(customer: &str, books: &[(&str, i64)]) -> NewOrder {
        NewOrder {
            customer_name: customer.to_string(),
            phone: "11 2345-6789".to_string(),
            lines: books
                .iter()
                .map(|(t, p)| NewBookLine::new(*t, pesos(*p)))
                .collect(),
            deposit: None,
            tentative_arrival: None,
        }
    }

    /// Inserts an order dated `days_ago` days in the past.
    async fn insert_aged(desk: &OrderDesk, customer: &str, title: &str, days_ago: i64) -> Order {
        let mut order = open_order(new_order(customer, &[(title, 100)])).unwrap();
        order.created_at = Utc::now() - Duration::days(days_ago);
        desk.database().orders().insert(&order).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_reservation_then_pickup() {
        let desk = setup().await;
        let order = desk
            .open_order(new_order("Ana", &[("Naturales 1", 8500), ("Sociales 1", 7200)]))
            .await
            .unwrap();

        let summary = desk.summary(&order.id).await.unwrap();
        assert_eq!(summary.minimum_for_pickup, pesos(7850));
        assert!(!summary.can_pickup_now);

        let order = desk.add_payment(&order.id, pesos(7850), "").await.unwrap();
        assert_eq!(order.payments[0].note, "Pago");
        assert!(desk.summary(&order.id).await.unwrap().can_pickup_now);
    }

    #[tokio::test]
    async fn test_in_store_line_must_be_paid_in_full() {
        let desk = setup().await;
        let order = desk
            .open_order(new_order("Ana", &[("Naturales 1", 8500), ("Sociales 1", 7200)]))
            .await
            .unwrap();
        let first = order.lines[0].id.clone();

        desk.set_line_state(&order.id, &first, FulfillmentState::InStore)
            .await
            .unwrap();
        desk.add_payment(&order.id, pesos(10_000), "").await.unwrap();

        let summary = desk.summary(&order.id).await.unwrap();
        assert_eq!(summary.minimum_for_pickup, pesos(12_100));
        assert_eq!(summary.shortfall, pesos(2_100));
        assert!(!summary.can_pickup_now);
    }

    #[tokio::test]
    async fn test_configured_payment_note() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let config = AtrilConfig {
            default_payment_note: "Efectivo".to_string(),
            ..AtrilConfig::default()
        };
        let desk = OrderDesk::with_config(db, &config);

        let order = desk.open_order(new_order("Ana", &[("A", 10)])).await.unwrap();
        let order = desk.add_payment(&order.id, pesos(5), "  ").await.unwrap();
        assert_eq!(order.payments[0].note, "Efectivo");

        let order = desk.add_payment(&order.id, pesos(5), "transferencia").await.unwrap();
        assert_eq!(order.payments[1].note, "transferencia");
    }

    #[tokio::test]
    async fn test_rejected_payment_writes_nothing() {
        let desk = setup().await;
        let order = desk.open_order(new_order("Ana", &[("A", 10)])).await.unwrap();

        let err = desk.add_payment(&order.id, Money::zero(), "").await.unwrap_err();
        assert!(err.is_validation());

        let reloaded = desk.order(&order.id).await.unwrap();
        assert!(reloaded.payments.is_empty());
        assert_eq!(reloaded.sync_version, 0);
    }

    #[tokio::test]
    async fn test_unknown_order_and_line() {
        let desk = setup().await;
        assert!(desk
            .add_payment("missing", pesos(1), "")
            .await
            .unwrap_err()
            .is_not_found());

        let order = desk.open_order(new_order("Ana", &[("A", 10)])).await.unwrap();
        let err = desk
            .set_line_state(&order.id, "no-such-line", FulfillmentState::InStore)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_intake_serves_oldest_first_and_shelves_rest() {
        let desk = setup().await;
        let newer = insert_aged(&desk, "Pedro", "Naturales 1", 1).await;
        let older = insert_aged(&desk, "Ana", "Naturales 1", 10).await;

        let outcome = desk
            .stock_intake("naturales 1", 3, BookCondition::New)
            .await
            .unwrap();

        assert_eq!(outcome.assigned_count, 2);
        assert_eq!(outcome.remainder_to_stock, 1);
        assert_eq!(outcome.assigned[0].order_id, older.id);
        assert_eq!(outcome.assigned[1].order_id, newer.id);

        for id in [&older.id, &newer.id] {
            let order = desk.order(id).await.unwrap();
            assert_eq!(order.lines[0].state, FulfillmentState::InStore);
            assert_eq!(order.sync_version, 1);
        }

        let stock = desk.stock().await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].quantity, 1);
        assert_eq!(stock[0].condition, BookCondition::New);
    }

    #[tokio::test]
    async fn test_intake_with_fewer_copies_than_waiting() {
        let desk = setup().await;
        let older = insert_aged(&desk, "Ana", "Atlas", 5).await;
        let newer = insert_aged(&desk, "Pedro", "Atlas", 2).await;

        let outcome = desk.stock_intake("Atlas", 1, BookCondition::Used).await.unwrap();
        assert_eq!(outcome.assigned_count, 1);
        assert_eq!(outcome.remainder_to_stock, 0);
        assert!(outcome.stock_entry.is_none());

        assert_eq!(
            desk.order(&older.id).await.unwrap().lines[0].state,
            FulfillmentState::InStore
        );
        assert_eq!(
            desk.order(&newer.id).await.unwrap().lines[0].state,
            FulfillmentState::Missing
        );
        assert!(desk.stock().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_intake_accumulates_stock() {
        let desk = setup().await;
        desk.stock_intake("Atlas", 2, BookCondition::Used).await.unwrap();
        desk.stock_intake("ATLAS", 3, BookCondition::Used).await.unwrap();

        let stock = desk.stock().await.unwrap();
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_invalid_intake_writes_nothing() {
        let desk = setup().await;
        let order = insert_aged(&desk, "Ana", "Atlas", 1).await;

        assert!(desk
            .stock_intake("Atlas", 0, BookCondition::New)
            .await
            .unwrap_err()
            .is_validation());
        assert!(desk
            .stock_intake("  ", 2, BookCondition::New)
            .await
            .unwrap_err()
            .is_validation());

        assert_eq!(
            desk.order(&order.id).await.unwrap().lines[0].state,
            FulfillmentState::Missing
        );
        assert!(desk.stock().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_intakes_never_double_assign() {
        let desk = setup().await;
        insert_aged(&desk, "Ana", "Atlas", 3).await;
        insert_aged(&desk, "Pedro", "Atlas", 2).await;

        let (a, b) = tokio::join!(
            desk.stock_intake("Atlas", 1, BookCondition::New),
            desk.stock_intake("Atlas", 1, BookCondition::New),
        );
        let a = a.unwrap();
        let b = b.unwrap();

        assert_eq!(a.assigned_count + b.assigned_count, 2);
        assert_ne!(a.assigned[0].line_id, b.assigned[0].line_id);
        assert!(desk.stock().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_on_order_lines_are_left_alone_by_intake() {
        let desk = setup().await;
        let order = insert_aged(&desk, "Ana", "Atlas", 1).await;

        let marked = desk.mark_title_on_order("atlas").await.unwrap();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].order_id, order.id);

        let outcome = desk.stock_intake("Atlas", 1, BookCondition::New).await.unwrap();
        assert_eq!(outcome.assigned_count, 0);
        assert_eq!(outcome.remainder_to_stock, 1);
        assert_eq!(
            desk.order(&order.id).await.unwrap().lines[0].state,
            FulfillmentState::OnOrder
        );
    }

    #[tokio::test]
    async fn test_board_and_notification() {
        let desk = setup().await;
        let ana = desk
            .open_order(new_order("Ana", &[("Naturales 1", 10), ("Atlas", 10)]))
            .await
            .unwrap();
        desk.open_order(new_order("Pedro", &[("naturales 1", 10)]))
            .await
            .unwrap();

        assert_eq!(desk.notification_link(&ana.id).await.unwrap(), None);

        desk.set_line_state(&ana.id, &ana.lines[1].id, FulfillmentState::InStore)
            .await
            .unwrap();

        let board = desk.board().await.unwrap();
        let missing = board
            .iter()
            .find(|g| g.state == FulfillmentState::Missing && g.title == "Naturales 1")
            .unwrap();
        assert_eq!(missing.count, 2);
        assert_eq!(missing.customer_names, vec!["Ana", "Pedro"]);

        let link = desk.notification_link(&ana.id).await.unwrap().unwrap();
        assert!(link.starts_with("https://wa.me/5491123456789?text="));
        assert!(link.contains("Atlas"));
    }

    #[tokio::test]
    async fn test_add_lines_and_typed_price() {
        let desk = setup().await;
        let order = desk.open_order(new_order("Ana", &[("A", 10)])).await.unwrap();

        let order = desk
            .add_lines(&order.id, vec![NewBookLine::new("B", pesos(20))])
            .await
            .unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[1].state, FulfillmentState::Missing);

        let order = desk
            .add_line_from_input(&order.id, "C", "no sé")
            .await
            .unwrap();
        assert_eq!(order.lines[2].unit_price, Money::zero());
        assert_eq!(order.total_price(), pesos(30));

        assert!(desk.add_lines(&order.id, Vec::new()).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let desk = setup().await;
        desk.stock_intake("Atlas", 4, BookCondition::New).await.unwrap();

        let entry = desk.adjust_stock("atlas", BookCondition::New, 1).await.unwrap();
        assert_eq!(entry.quantity, 1);
        assert_eq!(desk.stock().await.unwrap()[0].quantity, 1);

        assert!(desk
            .adjust_stock("Atlas", BookCondition::New, -1)
            .await
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn test_open_order_for_grade() {
        let desk = setup().await;
        let catalog = desk.database().catalog();
        let grade = catalog.create_grade("1er año").await.unwrap();
        catalog
            .add_book(&grade.id, "Naturales 1", None, pesos(8500))
            .await
            .unwrap();
        catalog
            .add_book(&grade.id, "Sociales 1", None, pesos(7200))
            .await
            .unwrap();

        let order = desk
            .open_order_for_grade("Ana", "1122334455", &grade.id, Some(pesos(1000)))
            .await
            .unwrap();
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total_price(), pesos(15_700));
        assert_eq!(order.total_paid(), pesos(1000));

        assert!(desk
            .open_order_for_grade("Ana", "", "missing", None)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
