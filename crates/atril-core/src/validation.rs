//! # Validation Module
//!
//! Input validation utilities for Atril.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend                                                     │
//! │  └── Basic format checks (empty, length)                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: atril-core (THIS MODULE)                                     │
//! │  └── Business rule validation, before any mutation                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::NewBookLine;
use crate::{MAX_AMOUNT_CENTS, MAX_INTAKE_QUANTITY, MAX_STOCK_QUANTITY, MAX_TITLE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a book title.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ```rust
/// use atril_core::validation::validate_title;
///
/// assert!(validate_title("Naturales 1").is_ok());
/// assert!(validate_title("  ").is_err());
/// ```
pub fn validate_title(title: &str) -> ValidationResult<()> {
    validate_required_text("title", title, MAX_TITLE_LEN)
}

/// Validates a customer name.
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    validate_required_text("customer name", name, MAX_TITLE_LEN)
}

fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a book price.
///
/// ## Rules
/// - Must be non-negative (zero is allowed: donated or unpriced books)
/// - Must not exceed MAX_AMOUNT_CENTS
///
/// ```rust
/// use atril_core::money::Money;
/// use atril_core::validation::validate_price;
///
/// assert!(validate_price(Money::from_cents(850_000)).is_ok());
/// assert!(validate_price(Money::zero()).is_ok());
/// assert!(validate_price(Money::from_cents(-1)).is_err());
/// assert!(validate_price(Money::from_cents(i64::MAX)).is_err());
/// ```
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() || price.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Turns free-form operator input into a price.
///
/// Unparsable input becomes zero; negative input is still rejected.
///
/// ```rust
/// use atril_core::money::Money;
/// use atril_core::validation::parse_price_or_zero;
///
/// assert_eq!(parse_price_or_zero("8500").unwrap(), Money::from_cents(850_000));
/// assert_eq!(parse_price_or_zero("n/a").unwrap(), Money::zero());
/// assert!(parse_price_or_zero("-5").is_err());
/// ```
pub fn parse_price_or_zero(input: &str) -> ValidationResult<Money> {
    let price = Money::parse_decimal(input).unwrap_or_default();
    validate_price(price)?;
    Ok(price)
}

/// Validates a payment amount.
///
/// ## Rules
/// - Must be positive (> 0). Zero is rejected, not silently ignored.
/// - Must not exceed MAX_AMOUNT_CENTS
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "payment amount".to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "payment amount".to_string(),
            min: 1,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates the number of copies in a stock intake.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_INTAKE_QUANTITY
pub fn validate_intake_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_INTAKE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_INTAKE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an absolute stock level set by hand.
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a margin in basis points (0% to 1000%).
pub fn validate_margin_bps(bps: u32) -> ValidationResult<()> {
    if bps > 100_000 {
        return Err(ValidationError::OutOfRange {
            field: "margin".to_string(),
            min: 0,
            max: 100_000,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates a batch of new lines. Stops at the first bad line.
pub fn validate_new_lines(lines: &[NewBookLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    for line in lines {
        validate_title(&line.title)?;
        validate_price(line.unit_price)?;
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ```rust
/// use atril_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
