//! # Domain Types
//!
//! Core domain types for the book-order workflow.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │    BookLine     │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │──►│  id (UUID)      │   │  id (UUID)      │       │
//! │  │  customer_name  │   │  title          │   │  amount         │       │
//! │  │  phone          │   │  unit_price     │   │  paid_at        │       │
//! │  │  created_at     │──►│  state          │   │  note           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  StockEntry     │   │FulfillmentState │   │ CatalogGrade    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  title          │   │  Missing        │   │  name           │       │
//! │  │  condition      │   │  OnOrder        │   │  books[]        │       │
//! │  │  quantity       │   │  InStore        │   │  (title, price) │       │
//! │  └─────────────────┘   │  Delivered      │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! A `BookLine` copies its price from the catalog when the order is taken.
//! Later catalog edits never reach existing lines.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;
use crate::DEFAULT_PAYMENT_NOTE;

/// Normalizes a title into the key used for matching.
///
/// Titles match case-insensitively once surrounding whitespace is removed.
///
/// ```rust
/// use atril_core::title_key;
///
/// assert_eq!(title_key("  Naturales 1 "), title_key("NATURALES 1"));
/// ```
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

// =============================================================================
// Fulfillment State
// =============================================================================

/// Where a single ordered book is in its journey to the customer.
///
/// ```text
/// Missing ──► OnOrder ──► InStore ──► Delivered
/// ```
/// The usual direction, not an enforced state machine: operators may move a
/// line to any state, including backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentState {
    /// Nobody has sourced this copy yet.
    Missing,
    /// Requested from the distributor.
    OnOrder,
    /// Physically in the shop, ready to hand over.
    InStore,
    /// Handed to the customer.
    Delivered,
}

impl FulfillmentState {
    /// All states, in lifecycle order.
    pub const ALL: [FulfillmentState; 4] = [
        FulfillmentState::Missing,
        FulfillmentState::OnOrder,
        FulfillmentState::InStore,
        FulfillmentState::Delivered,
    ];

    /// Stable wire/database name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            FulfillmentState::Missing => "missing",
            FulfillmentState::OnOrder => "on_order",
            FulfillmentState::InStore => "in_store",
            FulfillmentState::Delivered => "delivered",
        }
    }

    /// Lines still waiting for a copy; these carry the reservation hold.
    pub const fn is_reserved(&self) -> bool {
        matches!(self, FulfillmentState::Missing | FulfillmentState::OnOrder)
    }
}

impl Default for FulfillmentState {
    fn default() -> Self {
        FulfillmentState::Missing
    }
}

impl fmt::Display for FulfillmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FulfillmentState::ALL
            .into_iter()
            .find(|state| state.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "state".to_string(),
                allowed: FulfillmentState::ALL
                    .iter()
                    .map(|s| s.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Book Condition
// =============================================================================

/// Physical condition of a shelved copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum BookCondition {
    New,
    Used,
}

impl BookCondition {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BookCondition::New => "new",
            BookCondition::Used => "used",
        }
    }
}

impl fmt::Display for BookCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookCondition {
    type Err = ValidationError;

    /// Case-insensitive; anything other than new/used is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(BookCondition::New),
            "used" => Ok(BookCondition::Used),
            _ => Err(ValidationError::NotAllowed {
                field: "condition".to_string(),
                allowed: vec!["new".to_string(), "used".to_string()],
            }),
        }
    }
}

// =============================================================================
// Book Line
// =============================================================================

/// One physical book within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BookLine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Title as typed by the operator; matched case-insensitively.
    pub title: String,

    /// Price frozen when the line was added.
    pub unit_price: Money,

    /// Current fulfillment state.
    pub state: FulfillmentState,
}

impl BookLine {
    /// Creates a fresh line in `Missing`.
    pub fn new(title: impl Into<String>, unit_price: Money) -> Self {
        BookLine {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            unit_price,
            state: FulfillmentState::Missing,
        }
    }

    /// Case-insensitive title comparison.
    pub fn matches_title(&self, title: &str) -> bool {
        title_key(&self.title) == title_key(title)
    }
}

/// Input for a line that has not been added to an order yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewBookLine {
    pub title: String,
    pub unit_price: Money,
}

impl NewBookLine {
    pub fn new(title: impl Into<String>, unit_price: Money) -> Self {
        NewBookLine {
            title: title.into(),
            unit_price,
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A single money movement recorded against an order (or photocopy job).
/// Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub amount: Money,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub note: String,
}

impl Payment {
    /// Creates a payment dated now. A blank note becomes the default label.
    ///
    /// Amount validation belongs to the caller (see `validation`).
    pub fn new(amount: Money, note: &str) -> Self {
        let note = note.trim();
        Payment {
            id: Uuid::new_v4().to_string(),
            amount,
            paid_at: Utc::now(),
            note: if note.is_empty() {
                DEFAULT_PAYMENT_NOTE.to_string()
            } else {
                note.to_string()
            },
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A customer's aggregate request for one or more books.
///
/// Totals are always derived from `lines` and `payments`, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub phone: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Date the shop told the customer to expect the books.
    #[ts(as = "Option<String>")]
    pub tentative_arrival: Option<NaiveDate>,
    pub lines: Vec<BookLine>,
    pub payments: Vec<Payment>,
    /// Optimistic concurrency counter, bumped on every persisted mutation.
    pub sync_version: i64,
}

impl Order {
    /// Σ line prices.
    pub fn total_price(&self) -> Money {
        self.lines.iter().map(|l| l.unit_price).sum()
    }

    /// Σ payment amounts.
    pub fn total_paid(&self) -> Money {
        self.payments.iter().map(|p| p.amount).sum()
    }

    /// `total_price - total_paid`. Negative means credit in the customer's favour.
    pub fn debt(&self) -> Money {
        self.total_price() - self.total_paid()
    }

    /// How much the customer paid beyond the total, never negative.
    pub fn overpayment(&self) -> Money {
        (self.total_paid() - self.total_price()).clamp_non_negative()
    }

    pub fn line(&self, line_id: &str) -> Option<&BookLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// True once every line has been handed over (and there is at least one).
    pub fn is_settled(&self) -> bool {
        !self.lines.is_empty()
            && self
                .lines
                .iter()
                .all(|l| l.state == FulfillmentState::Delivered)
    }
}

// =============================================================================
// Stock
// =============================================================================

/// Free inventory for one `(title, condition)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockEntry {
    pub id: String,
    pub title: String,
    pub condition: BookCondition,
    pub quantity: i64,
}

impl StockEntry {
    pub fn new(title: impl Into<String>, condition: BookCondition) -> Self {
        StockEntry {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            condition,
            quantity: 0,
        }
    }

    pub fn matches(&self, title: &str, condition: BookCondition) -> bool {
        self.condition == condition && title_key(&self.title) == title_key(title)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A school grade/year grouping the books a class usually needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogGrade {
    pub id: String,
    pub name: String,
    pub books: Vec<CatalogBook>,
}

/// A pricing reference used to pre-fill new orders.
///
/// Not authoritative for existing book lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogBook {
    pub id: String,
    pub grade_id: String,
    pub title: String,
    pub publisher: Option<String>,
    pub price: Money,
}

impl CatalogBook {
    /// The line a new order gets when the operator picks this book.
    pub fn to_new_line(&self) -> NewBookLine {
        NewBookLine::new(self.title.clone(), self.price)
    }
}

impl CatalogGrade {
    /// Pre-fills an order with every book of the grade.
    pub fn to_new_lines(&self) -> Vec<NewBookLine> {
        self.books.iter().map(CatalogBook::to_new_line).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn order_with(prices: &[i64], paid: &[i64]) -> Order {
        Order {
            id: "o-1".to_string(),
            customer_name: "Ana".to_string(),
            phone: "11 5555-0000".to_string(),
            created_at: Utc::now(),
            tentative_arrival: None,
            lines: prices
                .iter()
                .map(|p| BookLine::new("Libro", Money::from_cents(*p)))
                .collect(),
            payments: paid
                .iter()
                .map(|p| Payment::new(Money::from_cents(*p), ""))
                .collect(),
            sync_version: 0,
        }
    }

    #[test]
    fn test_title_key() {
        assert_eq!(title_key("  Manual Estrada 2 "), "manual estrada 2");
    }

    #[test]
    fn test_state_round_trip_names() {
        for state in FulfillmentState::ALL {
            assert_eq!(state.as_str().parse::<FulfillmentState>().unwrap(), state);
        }
        assert!("shipped".parse::<FulfillmentState>().is_err());
    }

    #[test]
    fn test_state_serializes_snake_case() {
        let json = serde_json::to_string(&FulfillmentState::OnOrder).unwrap();
        assert_eq!(json, "\"on_order\"");
    }

    #[test]
    fn test_condition_parsing() {
        assert_eq!("NEW".parse::<BookCondition>().unwrap(), BookCondition::New);
        assert_eq!(" used ".parse::<BookCondition>().unwrap(), BookCondition::Used);
        assert!(matches!(
            "damaged".parse::<BookCondition>(),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[test]
    fn test_new_line_starts_missing() {
        let line = BookLine::new("Naturales 1", Money::from_cents(100));
        assert_eq!(line.state, FulfillmentState::Missing);
        assert!(line.matches_title("NATURALES 1"));
        assert!(!line.matches_title("Naturales 2"));
    }

    #[test]
    fn test_payment_default_note() {
        let payment = Payment::new(Money::from_cents(100), "   ");
        assert_eq!(payment.note, DEFAULT_PAYMENT_NOTE);

        let payment = Payment::new(Money::from_cents(100), "seña");
        assert_eq!(payment.note, "seña");
    }

    #[test]
    fn test_order_debt_and_overpayment() {
        let order = order_with(&[8500, 7200], &[5000]);
        assert_eq!(order.total_price().cents(), 15700);
        assert_eq!(order.debt().cents(), 10700);
        assert!(order.overpayment().is_zero());

        let order = order_with(&[1000], &[1500]);
        assert_eq!(order.debt().cents(), -500);
        assert_eq!(order.overpayment().cents(), 500);
    }

    #[test]
    fn test_is_settled() {
        let mut order = order_with(&[1000], &[]);
        assert!(!order.is_settled());
        order.lines[0].state = FulfillmentState::Delivered;
        assert!(order.is_settled());
        assert!(!order_with(&[], &[]).is_settled());
    }

    #[test]
    fn test_catalog_prefill() {
        let grade = CatalogGrade {
            id: "g-1".to_string(),
            name: "1er grado".to_string(),
            books: vec![CatalogBook {
                id: "b-1".to_string(),
                grade_id: "g-1".to_string(),
                title: "Naturales 1".to_string(),
                publisher: Some("Estrada".to_string()),
                price: Money::from_cents(850_000),
            }],
        };
        let lines = grade.to_new_lines();
        assert_eq!(lines, vec![NewBookLine::new("Naturales 1", Money::from_cents(850_000))]);
    }
}
