//! # Seed Data Generator
//!
//! Populates a database with a demo catalog and a handful of orders in
//! different states, for trying the shop frontend.
//!
//! ## Usage
//! ```bash
//! # Seed ./atril.db (or ATRIL_DB_PATH)
//! cargo run -p atril-db --bin seed
//!
//! # Specify database path
//! cargo run -p atril-db --bin seed -- --db ./data/atril_dev.db
//! ```
//!
//! ## Generated Data
//! - Three grades with their usual books
//! - One order per customer, pre-filled from a grade, some with a deposit
//! - A stock intake that serves the oldest waiting orders and shelves the rest

use std::env;
use std::path::PathBuf;

use atril_core::{BookCondition, Money};
use atril_db::{AtrilConfig, Database, OrderDesk};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Grades and their books: (grade, [(title, publisher, price in pesos)])
const CATALOG: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "1er año",
        &[
            ("Naturales 1", "Santillana", 8500),
            ("Sociales 1", "Kapelusz", 7200),
            ("Prácticas del Lenguaje 1", "Puerto de Palos", 7900),
        ],
    ),
    (
        "2do año",
        &[
            ("Biología 2", "Estrada", 9100),
            ("Historia 2", "Santillana", 8800),
        ],
    ),
    (
        "3er año",
        &[
            ("Física 3", "Maipue", 9600),
            ("Química 3", "Maipue", 9400),
            ("Atlas Escolar", "Kapelusz", 5600),
        ],
    ),
];

/// Customers: (name, phone, grade index, deposit in pesos)
const CUSTOMERS: &[(&str, &str, usize, i64)] = &[
    ("Ana Gómez", "11 2345-6789", 0, 5000),
    ("Pedro Ruiz", "11 4444-1234", 0, 0),
    ("Lucía Fernández", "+54 9 11 5555 0000", 1, 9000),
    ("Marta Díaz", "", 2, 2000),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut config = AtrilConfig::from_env();

    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config.database_path = PathBuf::from(path);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Atril Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ATRIL_DB_PATH or ./atril.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let db = Database::new(config.db_config()).await?;
    let desk = OrderDesk::with_config(db.clone(), &config);

    let existing = db.orders().count().await?;
    if existing > 0 {
        warn!(
            orders = existing,
            "Database already has orders; skipping seed. Delete the file to regenerate."
        );
        return Ok(());
    }

    // Catalog
    let mut grade_ids = Vec::with_capacity(CATALOG.len());
    for (grade_name, books) in CATALOG {
        let grade = db.catalog().create_grade(grade_name).await?;
        for (title, publisher, price) in books.iter() {
            db.catalog()
                .add_book(&grade.id, title, Some(*publisher), Money::from_major_minor(*price, 0))
                .await?;
        }
        info!(grade = %grade.name, books = books.len(), "Seeded grade");
        grade_ids.push(grade.id);
    }

    // Orders
    let mut order_ids = Vec::with_capacity(CUSTOMERS.len());
    for (name, phone, grade_idx, deposit) in CUSTOMERS {
        let deposit = Some(Money::from_major_minor(*deposit, 0));
        let order = desk
            .open_order_for_grade(name, phone, &grade_ids[*grade_idx], deposit)
            .await?;
        order_ids.push(order.id);
    }

    // Distributor request for one title, a delivery for another
    desk.mark_title_on_order("Sociales 1").await?;
    let outcome = desk
        .stock_intake("Naturales 1", 3, BookCondition::New)
        .await?;
    info!(
        assigned = outcome.assigned_count,
        shelved = outcome.remainder_to_stock,
        "Seeded stock intake"
    );
    desk.adjust_stock("Atlas Escolar", BookCondition::Used, 2).await?;

    // A payment on the first order and its arrival link
    if let Some(first) = order_ids.first() {
        desk.add_payment(first, Money::from_major_minor(3000, 0), "").await?;
        if let Some(link) = desk.notification_link(first).await? {
            info!(link = %link, "Notification link for first order");
        }
    }

    for group in desk.board().await? {
        info!(
            title = %group.title,
            state = %group.state,
            count = group.count,
            "Board"
        );
    }

    info!(orders = order_ids.len(), "Seed complete");
    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=atril=trace` - Show trace for atril crates only
/// - Default: `info,atril=debug,sqlx=warn`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atril=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
