//! Pricing
//!
//! Per-line pricing snapshots. A snapshot freezes the quantity, unit price and
//! discount evaluation of a single product line at the moment it is computed;
//! cart totals and order totals are both derived from [`LinePricing::total`],
//! which is the single source of truth for a line's effective amount.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    discounts::{self, DiscountError, DiscountWindow},
    prices::Price,
};

/// Errors that can occur while pricing a line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// Lines must carry at least one unit.
    #[error("quantity must be greater than zero")]
    ZeroQuantity,

    /// A minor-unit multiplication overflowed.
    #[error("line amount overflowed")]
    Overflow,

    /// Errors bubbled up from discount evaluation.
    #[error(transparent)]
    Discount(#[from] DiscountError),
}

/// The undiscounted portion of a line snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Units of the product on this line.
    pub quantity: u32,

    /// Unit price in minor units at snapshot time.
    pub unit_price: u64,

    /// `unit_price * quantity`.
    pub line_total: u64,
}

/// The discount portion of a line snapshot.
///
/// When no discount window is active this is the all-zero "no discount"
/// value with `applied` false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountInfo {
    /// Whether an active discount window applied at snapshot time.
    pub applied: bool,

    /// Reduction per unit in minor units.
    pub per_unit: u64,

    /// `per_unit * quantity`.
    pub total: u64,

    /// `unit_price - per_unit`.
    pub discounted_unit_price: u64,

    /// `discounted_unit_price * quantity`.
    pub discounted_line_total: u64,
}

impl DiscountInfo {
    /// The "no discount" snapshot.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            applied: false,
            per_unit: 0,
            total: 0,
            discounted_unit_price: 0,
            discounted_line_total: 0,
        }
    }
}

/// A complete frozen pricing snapshot for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    /// Undiscounted quantities and amounts.
    pub product: ProductInfo,

    /// Discount evaluation result.
    pub discount: DiscountInfo,
}

impl LinePricing {
    /// The effective amount this line contributes to a cart or order total.
    #[must_use]
    pub fn total(&self) -> u64 {
        if self.discount.applied {
            self.product.line_total - self.discount.total
        } else {
            self.product.line_total
        }
    }
}

/// Price a line of `quantity` units at `unit_price`, evaluating `window` at `now`.
///
/// # Errors
///
/// - [`PricingError::ZeroQuantity`] when `quantity` is zero.
/// - [`PricingError::Overflow`] when a minor-unit multiplication overflows.
/// - [`PricingError::Discount`] when discount evaluation fails.
pub fn price_line(
    quantity: u32,
    unit_price: Price,
    window: Option<&DiscountWindow>,
    now: Timestamp,
) -> Result<LinePricing, PricingError> {
    if quantity == 0 {
        return Err(PricingError::ZeroQuantity);
    }

    let units = u64::from(quantity);

    let line_total = unit_price
        .checked_mul_quantity(quantity)
        .ok_or(PricingError::Overflow)?;
    let unit_price = *unit_price;

    let product = ProductInfo {
        quantity,
        unit_price,
        line_total,
    };

    let discount = match window.filter(|w| w.is_active_at(now)) {
        None => DiscountInfo::none(),
        Some(w) => {
            let per_unit = discounts::percent_of_minor(w.percent, unit_price)?;

            let discounted_unit_price = unit_price
                .checked_sub(per_unit)
                .ok_or(DiscountError::ExceedsPrice)?;

            DiscountInfo {
                applied: true,
                per_unit,
                total: per_unit.checked_mul(units).ok_or(PricingError::Overflow)?,
                discounted_unit_price,
                discounted_line_total: discounted_unit_price
                    .checked_mul(units)
                    .ok_or(PricingError::Overflow)?,
            }
        }
    };

    Ok(LinePricing { product, discount })
}
