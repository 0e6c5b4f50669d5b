//! # atril-core: Pure Business Logic for Atril
//!
//! The book-order ledger of a kiosk/stationery/bookstore, as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Atril Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Shop frontend (out of tree)                  │   │
//! │  │    Orders ──► Payments ──► Stock intake ──► Board ──► WhatsApp  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               atril-db (OrderDesk + repositories)               │   │
//! │  │      load ──► call atril-core ──► persist, under one lock       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atril-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  orders   │  │  intake   │  │   board   │  │  notify   │  │   │
//! │  │   │  summary  │  │  FIFO     │  │  kanban   │  │  wa.me    │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐                 │   │
//! │  │   │  pricing  │  │   fiado   │  │ photocopy │                 │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, BookLine, Payment, StockEntry, catalog)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`orders`] - Order Ledger Engine: summaries and order mutations
//! - [`intake`] - Stock intake allocation across open orders
//! - [`board`] - Kanban aggregation of open lines
//! - [`notify`] - WhatsApp arrival link
//! - [`pricing`], [`fiado`], [`photocopy`] - Peer counter workflows
//! - [`error`], [`validation`] - Typed errors and input rules
//!
//! ## Example Usage
//!
//! ```rust
//! use atril_core::{open_order, Money, NewBookLine, NewOrder};
//!
//! let mut order = open_order(NewOrder {
//!     customer_name: "Ana".into(),
//!     phone: "11 2345 6789".into(),
//!     lines: vec![
//!         NewBookLine::new("Naturales 1", Money::from_major_minor(8500, 0)),
//!         NewBookLine::new("Sociales 1", Money::from_major_minor(7200, 0)),
//!     ],
//!     deposit: None,
//!     tentative_arrival: None,
//! })
//! .unwrap();
//!
//! // Both books missing: a 50% hold is needed to keep them reserved
//! assert_eq!(order.summary().minimum_for_pickup, Money::from_major_minor(7850, 0));
//!
//! order.add_payment(Money::from_major_minor(7850, 0), "").unwrap();
//! assert!(order.summary().can_pickup_now);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod board;
pub mod error;
pub mod fiado;
pub mod intake;
pub mod money;
pub mod notify;
pub mod orders;
pub mod photocopy;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use board::{aggregate_open_lines_by_title_and_state, BoardGroup};
pub use error::{CoreError, CoreResult, ValidationError};
pub use intake::{reconcile_stock_intake, IntakeOutcome};
pub use money::Money;
pub use orders::{compute_order_summary, mark_title_on_order, open_order, LineRef, NewOrder, OrderSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Share of a not-yet-arrived book's price that keeps it reserved (50%).
///
/// ## Business Reason
/// Stops the shop from earmarking scarce copies for customers who have paid
/// nothing. Gates only the pickup affordance, never payment recording.
pub const RESERVATION_HOLD_BPS: u32 = 5000;

/// Note stored on a payment recorded without one.
pub const DEFAULT_PAYMENT_NOTE: &str = "Pago";

/// Note stored on the deposit taken when an order is opened.
pub const DEPOSIT_NOTE: &str = "Seña";

/// Longest title or customer name accepted.
pub const MAX_TITLE_LEN: usize = 200;

/// Most copies accepted in one stock intake (typo guard: 1000 vs 10).
pub const MAX_INTAKE_QUANTITY: i64 = 10_000;

/// Largest single price or payment accepted, in centavos ($1.000.000.000,00).
///
/// Keeps order totals far from `i64` overflow.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Largest stock level that can be set by hand.
pub const MAX_STOCK_QUANTITY: i64 = 1_000_000;
