//! Products

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub(crate) use repository::{PgProductsRepository, try_get_amount};
pub use errors::ProductsServiceError;
pub use service::*;
