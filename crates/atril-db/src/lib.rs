//! # atril-db: Database Layer for Atril
//!
//! SQLite storage for the book-order ledger, plus the [`OrderDesk`] that
//! serializes every ledger write.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Atril Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Shop frontend (out of tree)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ atril-db (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────────┐                                               │   │
//! │  │   │  OrderDesk  │ ── write lock ── load → atril-core → save     │   │
//! │  │   └──────┬──────┘                                               │   │
//! │  │          │                                                      │   │
//! │  │   ┌──────▼──────┐  ┌─────────────┐  ┌─────────────┐            │   │
//! │  │   │   Orders    │  │    Stock    │  │   Catalog   │            │   │
//! │  │   │ Repository  │  │ Repository  │  │ Repository  │            │   │
//! │  │   └──────┬──────┘  └──────┬──────┘  └──────┬──────┘            │   │
//! │  │          └────────────────┼────────────────┘                    │   │
//! │  │                    ┌──────▼──────┐                              │   │
//! │  │                    │ SqlitePool  │  WAL, foreign keys           │   │
//! │  │                    └──────┬──────┘                              │   │
//! │  └───────────────────────────┼─────────────────────────────────────┘   │
//! │                              ▼                                          │
//! │                       atril.db (SQLite)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let config = AtrilConfig::from_env();
//! let db = Database::new(config.db_config()).await?;
//! let desk = OrderDesk::with_config(db, &config);
//!
//! let outcome = desk.stock_intake("Naturales 1", 3, BookCondition::New).await?;
//! ```

pub mod config;
pub mod desk;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use config::AtrilConfig;
pub use desk::OrderDesk;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::catalog::CatalogRepository;
pub use repository::order::OrderRepository;
pub use repository::stock::StockRepository;
