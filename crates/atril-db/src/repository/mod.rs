//! # Repository Module
//!
//! Database repository implementations for Atril.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  OrderDesk / seed binary                                                │
//! │       │                                                                 │
//! │       │  db.orders().require("uuid")                                    │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── list / get / require                                               │
//! │  ├── insert(&order)                                                     │
//! │  └── update(&order)   ← sync_version checked                            │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories map rows to `atril-core` types and back. They never apply
//! ledger rules themselves; that is `atril-core`'s job, sequenced by
//! [`OrderDesk`](crate::OrderDesk).
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`](order::OrderRepository) - Orders with lines and payments
//! - [`StockRepository`](stock::StockRepository) - Free inventory per (title, condition)
//! - [`CatalogRepository`](catalog::CatalogRepository) - Grades and reference books

pub mod catalog;
pub mod order;
pub mod stock;
