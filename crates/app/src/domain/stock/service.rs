//! Stock service.

use async_trait::async_trait;
use mockall::automock;
use tracing::info;

use crate::{
    database::Db,
    domain::{
        products::models::ProductUuid,
        stock::{
            errors::StockServiceError,
            repository::{DecreaseOutcome, PgStockRepository},
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgStockService {
    db: Db,
    repository: PgStockRepository,
}

impl PgStockService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgStockRepository::new(),
        }
    }
}

#[async_trait]
impl StockService for PgStockService {
    async fn check_availability(
        &self,
        product: ProductUuid,
        requested: u32,
    ) -> Result<(), StockServiceError> {
        if requested == 0 {
            return Err(StockServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let available = self
            .repository
            .available(&mut tx, product)
            .await?
            .ok_or(StockServiceError::ProductNotFound)?;

        tx.commit().await?;

        if available < u64::from(requested) {
            return Err(StockServiceError::InsufficientStock {
                available,
                requested: u64::from(requested),
            });
        }

        Ok(())
    }

    async fn increase(&self, product: ProductUuid, quantity: u32) -> Result<u64, StockServiceError> {
        if quantity == 0 {
            return Err(StockServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let stock = self
            .repository
            .increase(&mut tx, product, quantity)
            .await?
            .ok_or(StockServiceError::ProductNotFound)?;

        tx.commit().await?;

        info!(product_uuid = %product, quantity, stock, "increased stock");

        Ok(stock)
    }

    async fn decrease(&self, product: ProductUuid, quantity: u32) -> Result<u64, StockServiceError> {
        if quantity == 0 {
            return Err(StockServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let outcome = self.repository.decrease(&mut tx, product, quantity).await?;

        let stock = match outcome {
            DecreaseOutcome::Decremented(stock) => stock,
            DecreaseOutcome::NotFound => return Err(StockServiceError::ProductNotFound),
            DecreaseOutcome::Insufficient { available } => {
                return Err(StockServiceError::InsufficientStock {
                    available,
                    requested: u64::from(quantity),
                });
            }
        };

        tx.commit().await?;

        info!(product_uuid = %product, quantity, stock, "decreased stock");

        Ok(stock)
    }
}

#[automock]
#[async_trait]
pub trait StockService: Send + Sync {
    /// Succeeds with no side effect when at least `requested` units are held.
    async fn check_availability(
        &self,
        product: ProductUuid,
        requested: u32,
    ) -> Result<(), StockServiceError>;

    /// Atomically add `quantity` units; returns the new stock level.
    async fn increase(&self, product: ProductUuid, quantity: u32)
    -> Result<u64, StockServiceError>;

    /// Atomically remove `quantity` units; sufficiency is re-validated at
    /// write time, not just at an earlier check. Returns the new stock level.
    async fn decrease(&self, product: ProductUuid, quantity: u32)
    -> Result<u64, StockServiceError>;
}
