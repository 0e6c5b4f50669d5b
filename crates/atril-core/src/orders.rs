//! # Order Ledger Engine
//!
//! Everything that can be said about one order: what it costs, what has been
//! paid, and whether the customer may take the ready books home.
//!
//! ## Pickup Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order: 3 books                                                         │
//! │                                                                         │
//! │   InStore    $8.500  ──► full price        ┐                            │
//! │   Missing    $7.200  ──► 50% hold $3.600   ├─► minimum_for_pickup       │
//! │   Delivered  $6.000  ──► settled, ignored  ┘      = $12.100             │
//! │                                                                         │
//! │   total_paid >= $12.100 ? ──► can_pickup_now                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rule only gates the "notify / release goods" affordance. Payments and
//! state changes are always accepted; callers re-derive eligibility with
//! [`compute_order_summary`] afterwards.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{BookLine, FulfillmentState, NewBookLine, Order, Payment};
use crate::validation::{
    parse_price_or_zero, validate_customer_name, validate_new_lines, validate_payment_amount,
    validate_title,
};
use crate::{DEPOSIT_NOTE, RESERVATION_HOLD_BPS};

// =============================================================================
// Order Summary
// =============================================================================

/// Derived view of an order. Never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSummary {
    pub total_price: Money,
    pub total_paid: Money,
    /// May be negative (credit in favour of the customer).
    pub debt: Money,
    pub overpayment: Money,
    /// Full price of the `InStore` lines.
    pub pickup_cost: Money,
    /// 50% of the `Missing` + `OnOrder` lines.
    pub reservation_cost: Money,
    pub minimum_for_pickup: Money,
    pub can_pickup_now: bool,
    pub shortfall: Money,
    pub ready_count: usize,
    pub reserved_count: usize,
    pub delivered_count: usize,
}

/// Computes the ledger view of an order.
///
/// ## Example
/// ```rust
/// use atril_core::money::Money;
/// use atril_core::orders::{compute_order_summary, open_order, NewOrder};
/// use atril_core::types::{FulfillmentState, NewBookLine};
///
/// let mut order = open_order(NewOrder {
///     customer_name: "Ana".into(),
///     phone: "11 5555 0000".into(),
///     lines: vec![NewBookLine::new("A", Money::from_major_minor(8500, 0))],
///     deposit: Some(Money::from_major_minor(5000, 0)),
///     tentative_arrival: None,
/// })
/// .unwrap();
/// let line_id = order.lines[0].id.clone();
/// order.set_line_state(&line_id, FulfillmentState::InStore).unwrap();
///
/// let summary = compute_order_summary(&order);
/// assert!(!summary.can_pickup_now);
/// assert_eq!(summary.shortfall, Money::from_major_minor(3500, 0));
/// ```
pub fn compute_order_summary(order: &Order) -> OrderSummary {
    let total_price = order.total_price();
    let total_paid = order.total_paid();

    let mut pickup_cost = Money::zero();
    let mut reserved_total = Money::zero();
    let mut ready_count = 0;
    let mut reserved_count = 0;
    let mut delivered_count = 0;

    for line in &order.lines {
        match line.state {
            FulfillmentState::InStore => {
                pickup_cost += line.unit_price;
                ready_count += 1;
            }
            FulfillmentState::Missing | FulfillmentState::OnOrder => {
                reserved_total += line.unit_price;
                reserved_count += 1;
            }
            FulfillmentState::Delivered => delivered_count += 1,
        }
    }

    // Hold is taken on the sum, so rounding happens once per order
    let reservation_cost = reserved_total.percentage(RESERVATION_HOLD_BPS);
    let minimum_for_pickup = pickup_cost + reservation_cost;

    OrderSummary {
        total_price,
        total_paid,
        debt: total_price - total_paid,
        overpayment: (total_paid - total_price).clamp_non_negative(),
        pickup_cost,
        reservation_cost,
        minimum_for_pickup,
        can_pickup_now: total_paid >= minimum_for_pickup,
        shortfall: (minimum_for_pickup - total_paid).clamp_non_negative(),
        ready_count,
        reserved_count,
        delivered_count,
    }
}

// =============================================================================
// Line References
// =============================================================================

/// Points at one line inside one order; returned by bulk operations so the
/// persistence layer knows exactly what to write back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRef {
    pub order_id: String,
    pub line_id: String,
}

// =============================================================================
// Opening Orders
// =============================================================================

/// Everything needed to take a new order at the counter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub customer_name: String,
    pub phone: String,
    pub lines: Vec<NewBookLine>,
    /// Seed payment. `None` or zero means no deposit.
    pub deposit: Option<Money>,
    #[ts(as = "Option<String>")]
    pub tentative_arrival: Option<NaiveDate>,
}

/// Builds a new order: every line `Missing`, at most one deposit payment.
///
/// ## Errors
/// - `Validation` for a blank customer name, no lines, a bad line, or a
///   negative deposit.
pub fn open_order(new_order: NewOrder) -> CoreResult<Order> {
    validate_customer_name(&new_order.customer_name)?;
    validate_new_lines(&new_order.lines)?;

    let deposit = new_order.deposit.filter(|d| !d.is_zero());
    if let Some(amount) = deposit {
        validate_payment_amount(amount)?;
    }

    let lines = new_order
        .lines
        .into_iter()
        .map(|l| BookLine::new(l.title.trim(), l.unit_price))
        .collect();

    let payments = deposit
        .map(|amount| vec![Payment::new(amount, DEPOSIT_NOTE)])
        .unwrap_or_default();

    Ok(Order {
        id: Uuid::new_v4().to_string(),
        customer_name: new_order.customer_name.trim().to_string(),
        phone: new_order.phone.trim().to_string(),
        created_at: Utc::now(),
        tentative_arrival: new_order.tentative_arrival,
        lines,
        payments,
        sync_version: 0,
    })
}

// =============================================================================
// Order Mutations
// =============================================================================

impl Order {
    /// Derived ledger view, see [`compute_order_summary`].
    pub fn summary(&self) -> OrderSummary {
        compute_order_summary(self)
    }

    /// Records a payment dated now.
    ///
    /// ## Rules
    /// - `amount > 0`, otherwise `Validation` and the order is untouched
    /// - A blank note becomes the default label
    /// - Fulfillment states are never touched here
    pub fn add_payment(&mut self, amount: Money, note: &str) -> CoreResult<&Payment> {
        validate_payment_amount(amount)?;

        self.payments.push(Payment::new(amount, note));
        Ok(&self.payments[self.payments.len() - 1])
    }

    /// Appends books to the order, each starting in `Missing`.
    ///
    /// All lines are validated before any is appended. Returns the new lines.
    pub fn add_lines(&mut self, new_lines: Vec<NewBookLine>) -> CoreResult<&[BookLine]> {
        validate_new_lines(&new_lines)?;

        let first_new = self.lines.len();
        self.lines.extend(
            new_lines
                .into_iter()
                .map(|l| BookLine::new(l.title.trim(), l.unit_price)),
        );
        Ok(&self.lines[first_new..])
    }

    /// Operator override: any state to any state. Returns the previous state.
    pub fn set_line_state(
        &mut self,
        line_id: &str,
        new_state: FulfillmentState,
    ) -> CoreResult<FulfillmentState> {
        let order_id = &self.id;
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound {
                order_id: order_id.clone(),
                line_id: line_id.to_string(),
            })?;

        let previous = line.state;
        line.state = new_state;
        Ok(previous)
    }

    /// Lines physically ready to hand over.
    pub fn lines_in_store(&self) -> Vec<&BookLine> {
        self.lines
            .iter()
            .filter(|l| l.state == FulfillmentState::InStore)
            .collect()
    }
}

/// Builds a line for appending, parsing a free-form price from the operator.
///
/// Unparsable prices become zero.
pub fn new_line_from_input(title: &str, price_input: &str) -> CoreResult<NewBookLine> {
    validate_title(title)?;
    let price = parse_price_or_zero(price_input)?;
    Ok(NewBookLine::new(title.trim(), price))
}

// =============================================================================
// Bulk Operations
// =============================================================================

/// Moves every `Missing` line of `title` (across all orders) to `OnOrder`.
///
/// Used when the shop places one distributor request covering all customers
/// still waiting for that title.
pub fn mark_title_on_order(orders: &mut [Order], title: &str) -> CoreResult<Vec<LineRef>> {
    validate_title(title)?;

    let mut touched = Vec::new();
    for order in orders.iter_mut() {
        for line in order.lines.iter_mut() {
            if line.state == FulfillmentState::Missing && line.matches_title(title) {
                line.state = FulfillmentState::OnOrder;
                touched.push(LineRef {
                    order_id: order.id.clone(),
                    line_id: line.id.clone(),
                });
            }
        }
    }

    Ok(touched)
}

/// Finds an order by id.
pub fn find_order<'a>(orders: &'a [Order], order_id: &str) -> CoreResult<&'a Order> {
    orders
        .iter()
        .find(|o| o.id == order_id)
        .ok_or_else(|| CoreError::OrderNotFound(order_id.to_string()))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn pesos(units: i64) -> Money {
        Money::from_major_minor(units, 0)
    }

    fn order(lines: &[(&str, i64, FulfillmentState)], paid: &[i64]) -> Order {
        let mut order = open_order(NewOrder {
            customer_name: "Ana Martínez".to_string(),
            phone: "11 2345 6789".to_string(),
            lines: lines
                .iter()
                .map(|(t, p, _)| NewBookLine::new(*t, pesos(*p)))
                .collect(),
            deposit: None,
            tentative_arrival: None,
        })
        .unwrap();
        for (line, (_, _, state)) in order.lines.iter_mut().zip(lines) {
            line.state = *state;
        }
        for amount in paid {
            order.add_payment(pesos(*amount), "").unwrap();
        }
        order
    }

    #[test]
    fn test_ready_line_partially_paid() {
        let order = order(&[("A", 8500, FulfillmentState::InStore)], &[5000]);
        let summary = compute_order_summary(&order);

        assert_eq!(summary.pickup_cost, pesos(8500));
        assert_eq!(summary.reservation_cost, Money::zero());
        assert_eq!(summary.minimum_for_pickup, pesos(8500));
        assert!(!summary.can_pickup_now);
        assert_eq!(summary.shortfall, pesos(3500));
    }

    #[test]
    fn test_topping_up_enables_pickup() {
        let mut order = order(&[("A", 8500, FulfillmentState::InStore)], &[5000]);
        order.add_payment(pesos(3500), "").unwrap();
        let summary = order.summary();

        assert_eq!(summary.total_paid, pesos(8500));
        assert!(summary.can_pickup_now);
        assert_eq!(summary.shortfall, Money::zero());
    }

    #[test]
    fn test_missing_lines_need_half_hold() {
        let order = order(
            &[
                ("A", 8500, FulfillmentState::Missing),
                ("B", 7200, FulfillmentState::Missing),
            ],
            &[],
        );
        let summary = order.summary();

        assert_eq!(summary.pickup_cost, Money::zero());
        assert_eq!(summary.reservation_cost, pesos(7850));
        assert_eq!(summary.minimum_for_pickup, pesos(7850));
        assert!(!summary.can_pickup_now);
        assert_eq!(summary.reserved_count, 2);
    }

    #[test]
    fn test_delivered_lines_drop_out() {
        let order = order(
            &[
                ("A", 8500, FulfillmentState::Delivered),
                ("B", 7200, FulfillmentState::OnOrder),
                ("C", 1000, FulfillmentState::InStore),
            ],
            &[],
        );
        let summary = order.summary();

        assert_eq!(summary.total_price, pesos(16700));
        assert_eq!(summary.pickup_cost, pesos(1000));
        assert_eq!(summary.reservation_cost, pesos(3600));
        assert_eq!(summary.ready_count, 1);
        assert_eq!(summary.reserved_count, 1);
        assert_eq!(summary.delivered_count, 1);
    }

    #[test]
    fn test_empty_order_can_pickup() {
        let order = Order {
            lines: Vec::new(),
            ..order(&[("A", 1, FulfillmentState::Missing)], &[])
        };
        let summary = order.summary();
        assert_eq!(summary.total_price, Money::zero());
        assert!(summary.can_pickup_now);
    }

    #[test]
    fn test_debt_and_overpayment_are_complements() {
        for paid in [0, 500, 8500, 9000, 20000] {
            let payments: Vec<i64> = if paid > 0 { vec![paid] } else { Vec::new() };
            let s = order(&[("A", 8500, FulfillmentState::InStore)], &payments).summary();
            assert_eq!(s.debt, s.total_price - s.total_paid);
            assert_eq!(s.overpayment, (Money::zero() - s.debt).clamp_non_negative());
        }
    }

    #[test]
    fn test_can_pickup_is_monotonic_in_paid() {
        let lines = [
            ("A", 8500, FulfillmentState::InStore),
            ("B", 7201, FulfillmentState::Missing),
        ];
        let mut seen_true = false;
        for paid in (100..=20_000).step_by(100) {
            let can = order(&lines, &[paid]).summary().can_pickup_now;
            assert!(!(seen_true && !can), "eligibility regressed at {paid}");
            seen_true |= can;
        }
        assert!(seen_true);
    }

    #[test]
    fn test_negative_payment_rejected_and_order_unchanged() {
        let mut order = order(&[("A", 8500, FulfillmentState::Missing)], &[]);
        let before = order.clone();

        let err = order.add_payment(Money::from_cents(-10_000), "x").unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));
        assert!(order.add_payment(Money::zero(), "x").is_err());
        assert_eq!(order, before);
    }

    #[test]
    fn test_oversized_payment_rejected_and_summary_stays_finite() {
        let mut order = order(&[("A", 8500, FulfillmentState::InStore)], &[]);

        let half_of_i64 = Money::from_cents(i64::MAX / 2 + 1);
        assert!(matches!(
            order.add_payment(half_of_i64, ""),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(order.payments.is_empty());

        // Payments that slip past validation (e.g. read back from storage) saturate
        order.payments.push(Payment::new(half_of_i64, ""));
        order.payments.push(Payment::new(half_of_i64, ""));
        let summary = compute_order_summary(&order);
        assert_eq!(summary.total_paid.cents(), i64::MAX);
        assert!(summary.can_pickup_now);
    }

    #[test]
    fn test_payment_does_not_touch_states() {
        let mut order = order(&[("A", 100, FulfillmentState::Missing)], &[]);
        order.add_payment(pesos(1000), "adelanto").unwrap();
        assert_eq!(order.lines[0].state, FulfillmentState::Missing);
        assert_eq!(order.payments[0].note, "adelanto");
    }

    #[test]
    fn test_add_lines_appends_missing() {
        let mut order = order(&[("A", 100, FulfillmentState::InStore)], &[]);
        let added = order
            .add_lines(vec![NewBookLine::new(" B ", pesos(200))])
            .unwrap()
            .to_vec();

        assert_eq!(added.len(), 1);
        assert_eq!(added[0].title, "B");
        assert_eq!(added[0].state, FulfillmentState::Missing);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].state, FulfillmentState::InStore);
    }

    #[test]
    fn test_add_lines_is_all_or_nothing() {
        let mut order = order(&[("A", 100, FulfillmentState::Missing)], &[]);
        let result = order.add_lines(vec![
            NewBookLine::new("B", pesos(1)),
            NewBookLine::new("C", Money::from_cents(-1)),
        ]);
        assert!(result.is_err());
        assert_eq!(order.lines.len(), 1);
    }

    #[test]
    fn test_set_line_state_any_direction() {
        let mut order = order(&[("A", 100, FulfillmentState::Delivered)], &[]);
        let line_id = order.lines[0].id.clone();

        let previous = order
            .set_line_state(&line_id, FulfillmentState::Missing)
            .unwrap();
        assert_eq!(previous, FulfillmentState::Delivered);
        assert_eq!(order.lines[0].state, FulfillmentState::Missing);
    }

    #[test]
    fn test_set_line_state_unknown_line() {
        let mut order = order(&[("A", 100, FulfillmentState::Missing)], &[]);
        let err = order
            .set_line_state("nope", FulfillmentState::InStore)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_lines_in_store() {
        let order = order(
            &[
                ("A", 1, FulfillmentState::InStore),
                ("B", 1, FulfillmentState::Missing),
                ("C", 1, FulfillmentState::InStore),
            ],
            &[],
        );
        let titles: Vec<_> = order.lines_in_store().iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[test]
    fn test_open_order_with_deposit() {
        let order = open_order(NewOrder {
            customer_name: "  Pedro ".to_string(),
            phone: "".to_string(),
            lines: vec![NewBookLine::new("A", pesos(100))],
            deposit: Some(pesos(50)),
            tentative_arrival: None,
        })
        .unwrap();

        assert_eq!(order.customer_name, "Pedro");
        assert_eq!(order.payments.len(), 1);
        assert_eq!(order.total_paid(), pesos(50));
    }

    #[test]
    fn test_open_order_rejects_bad_input() {
        let base = NewOrder {
            customer_name: "Pedro".to_string(),
            phone: String::new(),
            lines: vec![NewBookLine::new("A", pesos(100))],
            deposit: None,
            tentative_arrival: None,
        };

        assert!(open_order(NewOrder { customer_name: " ".into(), ..base.clone() }).is_err());
        assert!(open_order(NewOrder { lines: vec![], ..base.clone() }).is_err());
        assert!(open_order(NewOrder { deposit: Some(pesos(-1)), ..base.clone() }).is_err());
        assert!(open_order(NewOrder { deposit: Some(Money::zero()), ..base })
            .unwrap()
            .payments
            .is_empty());
    }

    #[test]
    fn test_mark_title_on_order() {
        let mut orders = vec![
            order(&[("Naturales 1", 1, FulfillmentState::Missing)], &[]),
            order(
                &[
                    ("NATURALES 1", 1, FulfillmentState::InStore),
                    ("naturales 1", 1, FulfillmentState::Missing),
                    ("Sociales 1", 1, FulfillmentState::Missing),
                ],
                &[],
            ),
        ];

        let touched = mark_title_on_order(&mut orders, "Naturales 1").unwrap();
        assert_eq!(touched.len(), 2);
        assert_eq!(orders[0].lines[0].state, FulfillmentState::OnOrder);
        assert_eq!(orders[1].lines[0].state, FulfillmentState::InStore);
        assert_eq!(orders[1].lines[1].state, FulfillmentState::OnOrder);
        assert_eq!(orders[1].lines[2].state, FulfillmentState::Missing);

        assert!(mark_title_on_order(&mut orders, "").is_err());
    }

    #[test]
    fn test_new_line_from_input() {
        assert_eq!(new_line_from_input("A", "abc").unwrap().unit_price, Money::zero());
        assert_eq!(new_line_from_input("A", "12.5").unwrap().unit_price, Money::from_cents(1250));
        assert!(new_line_from_input("A", "-1").is_err());
        assert!(new_line_from_input("", "1").is_err());
    }

    #[test]
    fn test_find_order() {
        let orders = vec![order(&[("A", 1, FulfillmentState::Missing)], &[])];
        let id = orders[0].id.clone();
        assert!(find_order(&orders, &id).is_ok());
        assert!(find_order(&orders, "missing").unwrap_err().is_not_found());
    }
}
