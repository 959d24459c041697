//! Orders service errors.

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::orders::models::{InvalidTransition, OrderUuid};

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    #[error("unrecognized payment method")]
    InvalidPaymentMethod,

    #[error("cart is empty")]
    EmptyCart,

    #[error("address not found")]
    AddressNotFound,

    #[error("order not found")]
    NotFound,

    #[error("order is already cancelled")]
    AlreadyCancelled,

    #[error("product not found")]
    ProductNotFound,

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: u64, requested: u64 },

    /// The one failure that deliberately leaves a trace: the order row is
    /// committed in `failed` state and stays queryable.
    #[error("payment failed for order {order}")]
    PaymentFailed { order: OrderUuid },

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("related resource not found")]
    InvalidReference,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            _ => Self::Sql(error),
        }
    }
}
