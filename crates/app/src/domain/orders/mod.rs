//! Orders

pub mod errors;
pub mod models;
mod repositories;
pub mod service;

pub(crate) use repositories::{PgOrderItemsRepository, PgOrdersRepository, PgPaymentsRepository};
pub use errors::OrdersServiceError;
pub use service::*;
