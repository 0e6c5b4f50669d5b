//! # Catalog Repository
//!
//! Grades (school years) and the books each one usually needs. The catalog is
//! a pricing reference for pre-filling new orders; it never changes the
//! price of a line already in an order.

use std::collections::HashMap;

use atril_core::validation::{validate_price, validate_title};
use atril_core::{CatalogBook, CatalogGrade, Money};
use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

#[derive(Debug, FromRow)]
struct GradeRow {
    id: String,
    name: String,
}

#[derive(Debug, FromRow)]
struct BookRow {
    id: String,
    grade_id: String,
    title: String,
    publisher: Option<String>,
    price_cents: i64,
}

impl From<BookRow> for CatalogBook {
    fn from(row: BookRow) -> Self {
        CatalogBook {
            id: row.id,
            grade_id: row.grade_id,
            title: row.title,
            publisher: row.publisher,
            price: Money::from_cents(row.price_cents),
        }
    }
}

/// Repository for catalog grades and books.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Grades
    // =========================================================================

    /// Lists grades in creation order, each with its books.
    pub async fn list_grades(&self) -> DbResult<Vec<CatalogGrade>> {
        let grades: Vec<GradeRow> =
            sqlx::query_as("SELECT id, name FROM catalog_grades ORDER BY created_at, rowid")
                .fetch_all(&self.pool)
                .await?;

        let books: Vec<BookRow> = sqlx::query_as(
            "SELECT id, grade_id, title, publisher, price_cents FROM catalog_books
             ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut books_by_grade: HashMap<String, Vec<CatalogBook>> = HashMap::new();
        for row in books {
            books_by_grade
                .entry(row.grade_id.clone())
                .or_default()
                .push(row.into());
        }

        Ok(grades
            .into_iter()
            .map(|g| CatalogGrade {
                books: books_by_grade.remove(&g.id).unwrap_or_default(),
                id: g.id,
                name: g.name,
            })
            .collect())
    }

    /// Gets one grade with its books.
    pub async fn get_grade(&self, id: &str) -> DbResult<Option<CatalogGrade>> {
        let grade: Option<GradeRow> =
            sqlx::query_as("SELECT id, name FROM catalog_grades WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        let Some(grade) = grade else {
            return Ok(None);
        };

        let books: Vec<BookRow> = sqlx::query_as(
            "SELECT id, grade_id, title, publisher, price_cents FROM catalog_books
             WHERE grade_id = ?1 ORDER BY created_at, rowid",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CatalogGrade {
            id: grade.id,
            name: grade.name,
            books: books.into_iter().map(CatalogBook::from).collect(),
        }))
    }

    /// Creates an empty grade.
    ///
    /// ## Errors
    /// - `UniqueViolation` if a grade with that name exists
    pub async fn create_grade(&self, name: &str) -> DbResult<CatalogGrade> {
        validate_title(name)?;
        let name = name.trim();

        let grade = CatalogGrade {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            books: Vec::new(),
        };

        sqlx::query("INSERT INTO catalog_grades (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&grade.id)
            .bind(&grade.name)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_as(e, "grade name", name))?;

        info!(grade_id = %grade.id, name = %grade.name, "Catalog grade created");
        Ok(grade)
    }

    /// Renames a grade.
    pub async fn rename_grade(&self, id: &str, name: &str) -> DbResult<()> {
        validate_title(name)?;
        let name = name.trim();

        let result = sqlx::query("UPDATE catalog_grades SET name = ?1 WHERE id = ?2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_as(e, "grade name", name))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Grade", id));
        }
        Ok(())
    }

    /// Deletes a grade and all its books.
    pub async fn delete_grade(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM catalog_grades WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Grade", id));
        }

        info!(grade_id = %id, "Catalog grade deleted");
        Ok(())
    }

    // =========================================================================
    // Books
    // =========================================================================

    /// Adds a reference book to a grade.
    pub async fn add_book(
        &self,
        grade_id: &str,
        title: &str,
        publisher: Option<&str>,
        price: Money,
    ) -> DbResult<CatalogBook> {
        validate_title(title)?;
        validate_price(price)?;

        let exists: Option<String> =
            sqlx::query_scalar("SELECT id FROM catalog_grades WHERE id = ?1")
                .bind(grade_id)
                .fetch_optional(&self.pool)
                .await?;
        if exists.is_none() {
            return Err(DbError::not_found("Grade", grade_id));
        }

        let book = CatalogBook {
            id: Uuid::new_v4().to_string(),
            grade_id: grade_id.to_string(),
            title: title.trim().to_string(),
            publisher: clean_publisher(publisher),
            price,
        };

        sqlx::query(
            "INSERT INTO catalog_books (id, grade_id, title, publisher, price_cents, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&book.id)
        .bind(&book.grade_id)
        .bind(&book.title)
        .bind(&book.publisher)
        .bind(book.price.cents())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(book_id = %book.id, grade_id = %grade_id, "Catalog book added");
        Ok(book)
    }

    /// Rewrites title, publisher and price of a book.
    pub async fn update_book(&self, book: &CatalogBook) -> DbResult<CatalogBook> {
        validate_title(&book.title)?;
        validate_price(book.price)?;

        let updated = CatalogBook {
            title: book.title.trim().to_string(),
            publisher: clean_publisher(book.publisher.as_deref()),
            ..book.clone()
        };

        let result = sqlx::query(
            "UPDATE catalog_books SET title = ?1, publisher = ?2, price_cents = ?3 WHERE id = ?4",
        )
        .bind(&updated.title)
        .bind(&updated.publisher)
        .bind(updated.price.cents())
        .bind(&updated.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Book", &book.id));
        }
        Ok(updated)
    }

    /// Removes a book from its grade.
    pub async fn delete_book(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM catalog_books WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Book", id));
        }
        Ok(())
    }
}

fn clean_publisher(publisher: Option<&str>) -> Option<String> {
    publisher
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

/// Gives a UNIQUE violation the offending value.
fn duplicate_as(err: sqlx::Error, field: &str, value: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate(field, value),
        other => other,
    }
}
