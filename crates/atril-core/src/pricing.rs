//! # Pricing
//!
//! Public price = cost plus the category margin, rounded up to a whole unit.
//!
//! ```text
//! cost $1.234,10  ×  (1 + 40%)  =  $1.727,74  ──ceil──►  $1.728,00
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::{Money, BPS_SCALE};
use crate::validation::{validate_margin_bps, validate_price, validate_title};

/// A product category and its markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Markup over cost in basis points (4000 = 40%).
    pub margin_bps: u32,
}

impl Category {
    pub fn new(name: &str, margin_bps: u32) -> CoreResult<Self> {
        validate_title(name)?;
        validate_margin_bps(margin_bps)?;
        Ok(Category {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            margin_bps,
        })
    }

    /// Shelf price for something that cost `cost`.
    pub fn public_price(&self, cost: Money) -> CoreResult<Money> {
        public_price(cost, self.margin_bps)
    }
}

/// Applies `margin_bps` to `cost` and rounds up to the next whole unit.
///
/// The rounding is a true ceiling of the exact product, not of a
/// pre-rounded centavo value.
///
/// ```rust
/// use atril_core::money::Money;
/// use atril_core::pricing::public_price;
///
/// let price = public_price(Money::from_cents(123_410), 4000).unwrap();
/// assert_eq!(price, Money::from_cents(172_800));
/// ```
pub fn public_price(cost: Money, margin_bps: u32) -> CoreResult<Money> {
    validate_price(cost)?;
    validate_margin_bps(margin_bps)?;

    let numerator = cost.cents() as i128 * (BPS_SCALE as i128 + margin_bps as i128);
    // One whole unit is 100 centavos
    let unit = BPS_SCALE as i128 * 100;
    let units = (numerator + unit - 1) / unit;
    let cents = i64::try_from(units * 100).map_err(|_| ValidationError::OutOfRange {
        field: "public price".to_string(),
        min: 0,
        max: i64::MAX,
    })?;
    Ok(Money::from_cents(cents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    #[test]
    fn test_public_price_rounds_up() {
        // 1000.00 + 45% = 1450.00 exactly
        assert_eq!(
            public_price(Money::from_cents(100_000), 4500).unwrap(),
            Money::from_cents(145_000)
        );
        // 999.99 + 50% = 1499.985 → 1500
        assert_eq!(
            public_price(Money::from_cents(99_999), 5000).unwrap(),
            Money::from_cents(150_000)
        );
        assert_eq!(public_price(Money::zero(), 5000).unwrap(), Money::zero());
    }

    #[test]
    fn test_public_price_rejects_negative_cost() {
        assert!(public_price(Money::from_cents(-1), 4000).is_err());
    }

    #[test]
    fn test_public_price_rejects_huge_cost() {
        assert!(matches!(
            public_price(Money::from_cents(i64::MAX), 100_000),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        // Largest accepted cost at the largest margin still fits
        let top = public_price(Money::from_cents(crate::MAX_AMOUNT_CENTS), 100_000).unwrap();
        assert_eq!(top.cents(), crate::MAX_AMOUNT_CENTS * 11);
    }

    #[test]
    fn test_category() {
        let cat = Category::new("Literatura", 4000).unwrap();
        assert_eq!(
            cat.public_price(Money::from_cents(50_000)).unwrap(),
            Money::from_cents(70_000)
        );
        assert!(Category::new("", 4000).is_err());
    }
}
