//! Order Models

use std::{fmt, str::FromStr};

use jiff::Timestamp;
use thiserror::Error;

use crate::{
    domain::{
        addresses::models::AddressUuid, carts::models::CartItem, payments::models::Payment,
        products::models::ProductUuid, users::models::UserUuid,
    },
    uuids::TypedUuid,
};

/// Order UUID
pub type OrderUuid = TypedUuid<Order>;

/// Order lifecycle.
///
/// `Pending -> Processing -> {Completed | Failed}`, and any non-cancelled
/// state can move to `Cancelled`. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// Rejected status transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid order status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed | Self::Failed)
                | (
                    Self::Pending | Self::Processing | Self::Completed | Self::Failed,
                    Self::Cancelled
                )
        )
    }

    /// Move to `next`, rejecting anything outside the lifecycle.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] when `next` is not reachable from the
    /// current state.
    pub fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized order status")]
pub struct UnknownOrderStatus;

impl FromStr for OrderStatus {
    type Err = UnknownOrderStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(UnknownOrderStatus),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order Model
///
/// Immutable once created except for `status`. The items are a copy of the
/// cart lines at placement; later catalog or cart changes never reach them.
#[derive(Debug, Clone)]
pub struct Order {
    pub uuid: OrderUuid,
    pub user_uuid: UserUuid,
    pub address_uuid: AddressUuid,
    pub status: OrderStatus,
    pub total: u64,
    pub placed_at: Timestamp,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Order Item UUID
pub type OrderItemUuid = TypedUuid<OrderItem>;

/// OrderItem Model
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub uuid: OrderItemUuid,
    pub order_uuid: OrderUuid,
    pub product_uuid: ProductUuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
    pub discount_applied: bool,
    pub discount_per_unit: u64,
    pub total_discount: u64,
    pub discounted_unit_price: u64,
    pub discounted_line_total: u64,
    pub created_at: Timestamp,
}

impl OrderItem {
    /// The amount this line contributed to the order total.
    #[must_use]
    pub fn effective_line_total(&self) -> u64 {
        if self.discount_applied {
            self.discounted_line_total
        } else {
            self.line_total
        }
    }
}

/// Order line about to be persisted, frozen from a cart line.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub uuid: OrderItemUuid,
    pub product_uuid: ProductUuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
    pub discount_applied: bool,
    pub discount_per_unit: u64,
    pub total_discount: u64,
    pub discounted_unit_price: u64,
    pub discounted_line_total: u64,
}

impl NewOrderItem {
    /// Copy a cart line's snapshot. A copy, not a reference: mutating the
    /// cart afterwards must not reach into the placed order.
    #[must_use]
    pub fn from_cart_line(item: &CartItem, product_name: String) -> Self {
        Self {
            uuid: OrderItemUuid::new(),
            product_uuid: item.product_uuid,
            product_name,
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.line_total,
            discount_applied: item.discount_applied,
            discount_per_unit: item.discount_per_unit,
            total_discount: item.total_discount,
            discounted_unit_price: item.discounted_unit_price,
            discounted_line_total: item.discounted_line_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions_are_permitted() {
        use OrderStatus::*;

        for (from, to) in [
            (Pending, Processing),
            (Processing, Completed),
            (Processing, Failed),
            (Pending, Cancelled),
            (Processing, Cancelled),
            (Completed, Cancelled),
            (Failed, Cancelled),
        ] {
            assert_eq!(from.transition(to), Ok(to), "{from} -> {to}");
        }
    }

    #[test]
    fn out_of_lifecycle_transitions_are_rejected() {
        use OrderStatus::*;

        for (from, to) in [
            (Pending, Completed),
            (Pending, Failed),
            (Completed, Processing),
            (Completed, Failed),
            (Failed, Completed),
            (Cancelled, Cancelled),
            (Cancelled, Pending),
            (Cancelled, Completed),
        ] {
            assert_eq!(
                from.transition(to),
                Err(InvalidTransition { from, to }),
                "{from} -> {to} should be rejected"
            );
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        use OrderStatus::*;

        for status in [Pending, Processing, Completed, Failed, Cancelled] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }
}
