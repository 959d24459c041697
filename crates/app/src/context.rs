//! App Context

use std::sync::Arc;

use thiserror::Error;

use crate::{
    database::{self, Db},
    domain::{
        addresses::{AddressesService, PgAddressesService},
        carts::{CartsService, PgCartsService},
        orders::{OrdersService, PgOrdersService},
        payments::{PaymentGateway, SimulatedGateway},
        products::{PgProductsService, ProductsService},
        stock::{PgStockService, StockService},
        users::{PgUsersService, UsersService},
    },
};

#[derive(Debug, Error)]
pub enum AppInitError {
    #[error("failed to connect to database")]
    Database(#[source] sqlx::Error),
}

#[derive(Clone)]
pub struct AppContext {
    pub users: Arc<dyn UsersService>,
    pub addresses: Arc<dyn AddressesService>,
    pub products: Arc<dyn ProductsService>,
    pub stock: Arc<dyn StockService>,
    pub carts: Arc<dyn CartsService>,
    pub orders: Arc<dyn OrdersService>,
}

impl AppContext {
    /// Build application context from a database URL.
    ///
    /// The payment gateway is the simulated processor until a real
    /// integration replaces it.
    ///
    /// # Errors
    ///
    /// Returns an error when establishing a database connection fails.
    pub async fn from_database_url(url: &str) -> Result<Self, AppInitError> {
        let pool = database::connect(url).await.map_err(AppInitError::Database)?;

        let db = Db::new(pool);
        let gateway: Arc<dyn PaymentGateway> = Arc::new(SimulatedGateway::new());

        Ok(Self {
            users: Arc::new(PgUsersService::new(db.clone())),
            addresses: Arc::new(PgAddressesService::new(db.clone())),
            products: Arc::new(PgProductsService::new(db.clone())),
            stock: Arc::new(PgStockService::new(db.clone())),
            carts: Arc::new(PgCartsService::new(db.clone())),
            orders: Arc::new(PgOrdersService::new(db, gateway)),
        })
    }
}
