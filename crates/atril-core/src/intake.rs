//! # Stock Intake
//!
//! Newly arrived copies serve waiting customers before they reach the shelf.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Intake: 3 × "Naturales 1" (new)                                        │
//! │                                                                         │
//! │  Missing lines with that title, oldest order first:                     │
//! │    2024-02-01  Order X  ──► InStore  (qty 3 → 2)                        │
//! │    2024-02-10  Order Y  ──► InStore  (qty 2 → 1)                        │
//! │                                                                         │
//! │  Candidates exhausted, 1 copy left                                      │
//! │    StockEntry("Naturales 1", New).quantity += 1                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only `Missing` lines qualify. `OnOrder` lines stay where they are and
//! must be moved by hand.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::orders::LineRef;
use crate::types::{BookCondition, FulfillmentState, Order, StockEntry};
use crate::validation::{validate_intake_quantity, validate_stock_quantity, validate_title};

/// Result of one stock intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct IntakeOutcome {
    /// Lines moved to `InStore`, in allocation order.
    pub assigned: Vec<LineRef>,
    pub assigned_count: i64,
    /// Copies shelved as free inventory.
    pub remainder_to_stock: i64,
    /// The stock entry after the remainder was added, if any was.
    pub stock_entry: Option<StockEntry>,
}

/// Distributes `quantity` arrived copies of `title` across open orders.
///
/// ## Algorithm
/// 1. Collect `Missing` lines whose title matches case-insensitively
/// 2. Stable-sort them by their order's `created_at`, oldest first
/// 3. Move one line to `InStore` per copy until copies or lines run out
/// 4. Add what is left to `StockEntry(title, condition)`, creating it at 0
///
/// ## Errors
/// `Validation` for a blank title or `quantity <= 0`. Nothing is touched
/// when validation fails.
///
/// ## Example
/// ```rust
/// use atril_core::intake::reconcile_stock_intake;
/// use atril_core::types::BookCondition;
///
/// let mut orders: Vec<atril_core::types::Order> = Vec::new();
/// let mut stock = Vec::new();
/// let outcome =
///     reconcile_stock_intake(&mut orders, &mut stock, "Atlas", 2, BookCondition::Used).unwrap();
/// assert_eq!(outcome.assigned_count, 0);
/// assert_eq!(outcome.remainder_to_stock, 2);
/// assert_eq!(stock[0].quantity, 2);
/// ```
pub fn reconcile_stock_intake(
    orders: &mut [Order],
    stock: &mut Vec<StockEntry>,
    title: &str,
    quantity: i64,
    condition: BookCondition,
) -> CoreResult<IntakeOutcome> {
    validate_title(title)?;
    validate_intake_quantity(quantity)?;

    // (order index, line index); gathered in order/line sequence so the
    // stable sort below keeps that sequence for equal dates
    let mut candidates: Vec<(usize, usize)> = Vec::new();
    for (oi, order) in orders.iter().enumerate() {
        for (li, line) in order.lines.iter().enumerate() {
            if line.state == FulfillmentState::Missing && line.matches_title(title) {
                candidates.push((oi, li));
            }
        }
    }
    candidates.sort_by_key(|&(oi, _)| orders[oi].created_at);

    let mut remaining = quantity;
    let mut assigned = Vec::new();
    for (oi, li) in candidates {
        if remaining == 0 {
            break;
        }
        let order = &mut orders[oi];
        let line = &mut order.lines[li];
        line.state = FulfillmentState::InStore;
        remaining -= 1;
        assigned.push(LineRef {
            order_id: order.id.clone(),
            line_id: line.id.clone(),
        });
    }

    let stock_entry = if remaining > 0 {
        let entry = stock_entry_mut(stock, title, condition);
        entry.quantity = entry.quantity.saturating_add(remaining);
        Some(entry.clone())
    } else {
        None
    };

    Ok(IntakeOutcome {
        assigned_count: assigned.len() as i64,
        assigned,
        remainder_to_stock: remaining,
        stock_entry,
    })
}

/// Finds the entry for `(title, condition)`, creating it at zero.
pub fn stock_entry_mut<'a>(
    stock: &'a mut Vec<StockEntry>,
    title: &str,
    condition: BookCondition,
) -> &'a mut StockEntry {
    match stock.iter().position(|e| e.matches(title, condition)) {
        Some(idx) => &mut stock[idx],
        None => {
            stock.push(StockEntry::new(title.trim(), condition));
            let last = stock.len() - 1;
            &mut stock[last]
        }
    }
}

/// Sets a shelf count by hand (after a physical count, a sale, a loss).
pub fn adjust_stock(
    stock: &mut Vec<StockEntry>,
    title: &str,
    condition: BookCondition,
    quantity: i64,
) -> CoreResult<StockEntry> {
    validate_title(title)?;
    validate_stock_quantity(quantity)?;

    let entry = stock_entry_mut(stock, title, condition);
    entry.quantity = quantity;
    Ok(entry.clone())
}

// =============================================================================
// Unit Tests
// =============================================================================
