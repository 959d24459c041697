//! Cart Models

use jiff::Timestamp;
use serde::Serialize;

use crate::{
    domain::{products::models::ProductUuid, users::models::UserUuid},
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<Cart>;

/// Cart Model
///
/// `total` is the cached aggregate maintained by signed line-total deltas;
/// it must always equal the sum of the items' effective line totals.
#[derive(Debug, Clone)]
pub struct Cart {
    pub uuid: CartUuid,
    pub user_uuid: UserUuid,
    pub total: u64,
    pub items: Vec<CartItem>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Cart Item UUID
pub type CartItemUuid = TypedUuid<CartItem>;

/// CartItem Model
///
/// Carries the pricing snapshot frozen at the last quantity change; the
/// snapshot is never live-updated when the catalog changes afterwards.
#[derive(Debug, Clone)]
pub struct CartItem {
    pub uuid: CartItemUuid,
    pub cart_uuid: CartUuid,
    pub product_uuid: ProductUuid,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
    pub discount_applied: bool,
    pub discount_per_unit: u64,
    pub total_discount: u64,
    pub discounted_unit_price: u64,
    pub discounted_line_total: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CartItem {
    /// The amount this line contributes to the cart total.
    #[must_use]
    pub fn effective_line_total(&self) -> u64 {
        if self.discount_applied {
            self.discounted_line_total
        } else {
            self.line_total
        }
    }
}

/// Lightweight cart view for badge-style consumers.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub cart_uuid: CartUuid,
    pub item_count: u64,
    pub total: u64,
}
