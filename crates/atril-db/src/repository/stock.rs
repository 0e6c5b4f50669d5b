//! # Stock Repository
//!
//! Free inventory: copies on the shelf that no order claimed.
//! One row per `(title, condition)`, keyed case-insensitively on title.

use atril_core::{title_key, BookCondition, StockEntry};
use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct StockRow {
    id: String,
    title: String,
    condition: BookCondition,
    quantity: i64,
}

impl From<StockRow> for StockEntry {
    fn from(row: StockRow) -> Self {
        StockEntry {
            id: row.id,
            title: row.title,
            condition: row.condition,
            quantity: row.quantity,
        }
    }
}

/// Repository for stock entries.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Lists every stock entry, by title then condition.
    pub async fn list(&self) -> DbResult<Vec<StockEntry>> {
        let rows: Vec<StockRow> = sqlx::query_as(
            "SELECT id, title, condition, quantity FROM stock_entries
             ORDER BY title_key, condition",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockEntry::from).collect())
    }

    /// Finds the entry for `(title, condition)`.
    pub async fn find(&self, title: &str, condition: BookCondition) -> DbResult<Option<StockEntry>> {
        let row: Option<StockRow> = sqlx::query_as(
            "SELECT id, title, condition, quantity FROM stock_entries
             WHERE title_key = ?1 AND condition = ?2",
        )
        .bind(title_key(title))
        .bind(condition)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StockEntry::from))
    }

    /// Writes `entry` as the current count for its `(title, condition)`.
    pub async fn upsert(&self, entry: &StockEntry) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_in(&mut *conn, entry).await
    }

    /// Upsert on `conn`, so intake can include it in its transaction.
    ///
    /// An existing row keeps its id and original title spelling.
    pub(crate) async fn upsert_in(conn: &mut SqliteConnection, entry: &StockEntry) -> DbResult<()> {
        if entry.quantity < 0 {
            return Err(DbError::Internal(format!(
                "negative stock for {} ({})",
                entry.title, entry.condition
            )));
        }

        sqlx::query(
            "INSERT INTO stock_entries (id, title, title_key, condition, quantity, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(title_key, condition) DO UPDATE
             SET quantity = excluded.quantity, updated_at = excluded.updated_at",
        )
        .bind(&entry.id)
        .bind(&entry.title)
        .bind(title_key(&entry.title))
        .bind(entry.condition)
        .bind(entry.quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        debug!(
            title = %entry.title,
            condition = %entry.condition,
            quantity = entry.quantity,
            "Stock entry written"
        );
        Ok(())
    }
}
