//! Product Models

use checkout::discounts::DiscountWindow;
use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<Product>;

/// Product Model
///
/// `stock_quantity` is owned by the stock ledger; the catalog write paths
/// never touch it. The discount window is all-or-nothing: the persistence
/// layer maps a partially populated triple back to `None`.
#[derive(Debug, Clone)]
pub struct Product {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: u64,
    pub stock_quantity: u64,
    pub discount: Option<DiscountWindow>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// New Product Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: u64,
    pub stock_quantity: u64,
    pub discount: Option<DiscountWindow>,
}

/// Product Update Model
#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub name: String,
    pub price: u64,
    pub discount: Option<DiscountWindow>,
}
