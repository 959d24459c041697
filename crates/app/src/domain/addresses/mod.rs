//! Addresses

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub(crate) use repository::PgAddressesRepository;
pub use errors::AddressesServiceError;
pub use service::*;
