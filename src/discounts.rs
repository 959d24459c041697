//! Discounts
//!
//! A discount is a time-bounded percentage reduction on a product's unit price.
//! Activation is evaluated against a caller-supplied instant, strictly inside
//! the `(starts_at, ends_at)` window.

use jiff::Timestamp;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors specific to discount calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiscountError {
    /// Percentage calculation could not be safely converted.
    #[error("percentage conversion overflowed or was not finite")]
    PercentConversion,

    /// The computed reduction exceeds the unit price.
    #[error("discount exceeds the unit price")]
    ExceedsPrice,
}

/// A time-bounded percentage discount window.
///
/// The three fields are a unit: persistence layers must store either all of
/// them or none of them, and map anything partial back to "no discount".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountWindow {
    /// Percentage reduction, out of 100 (e.g. `20` for 20% off).
    pub percent: Decimal,

    /// Instant the window opens (exclusive).
    pub starts_at: Timestamp,

    /// Instant the window closes (exclusive).
    pub ends_at: Timestamp,
}

impl DiscountWindow {
    /// Creates a new discount window.
    #[must_use]
    pub const fn new(percent: Decimal, starts_at: Timestamp, ends_at: Timestamp) -> Self {
        Self {
            percent,
            starts_at,
            ends_at,
        }
    }

    /// Whether the window is active at `now`.
    ///
    /// Both bounds are strict: a window is not active at exactly `starts_at`
    /// or exactly `ends_at`.
    #[must_use]
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.starts_at < now && now < self.ends_at
    }

    /// Whether the window has fully elapsed at `now`.
    #[must_use]
    pub fn has_elapsed(&self, now: Timestamp) -> bool {
        self.ends_at <= now
    }
}

/// Calculate `percent` of a minor-unit amount, rounding midpoint away from zero.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] when the calculation overflows
/// or the result cannot be represented in minor units.
pub fn percent_of_minor(percent: Decimal, minor: u64) -> Result<u64, DiscountError> {
    let minor = Decimal::from_u64(minor).ok_or(DiscountError::PercentConversion)?;

    percent
        .checked_mul(minor)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(DiscountError::PercentConversion)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u64()
        .ok_or(DiscountError::PercentConversion)
}

/// The unit price after applying `window` at `now`.
///
/// Returns the price unchanged when there is no window or the window is not
/// active.
///
/// # Errors
///
/// Returns [`DiscountError::PercentConversion`] on percentage overflow and
/// [`DiscountError::ExceedsPrice`] when the reduction is larger than the price
/// itself (a percentage above 100).
pub fn discounted_unit_price(
    unit_price: u64,
    window: Option<&DiscountWindow>,
    now: Timestamp,
) -> Result<u64, DiscountError> {
    let Some(window) = window.filter(|w| w.is_active_at(now)) else {
        return Ok(unit_price);
    };

    let per_unit = percent_of_minor(window.percent, unit_price)?;

    unit_price
        .checked_sub(per_unit)
        .ok_or(DiscountError::ExceedsPrice)
}

/// Write-path housekeeping: drop a window that has fully elapsed at `now`.
///
/// Replaces the original system's implicit entity-lifecycle hook with an
/// explicit step the product write path calls before persisting.
#[must_use]
pub fn normalize(window: Option<DiscountWindow>, now: Timestamp) -> Option<DiscountWindow> {
    window.filter(|w| !w.has_elapsed(now))
}
