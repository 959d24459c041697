//! Carts service errors.

use checkout::pricing::PricingError;
use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartsServiceError {
    #[error("quantity must be greater than zero")]
    InvalidQuantity,

    #[error("product not found")]
    ProductNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: u64, requested: u64 },

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("related resource not found")]
    InvalidReference,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for CartsServiceError {
    fn from(error: Error) -> Self {
        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}
