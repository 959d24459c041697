//! Products service.

use async_trait::async_trait;
use checkout::discounts::{self, DiscountWindow};
use jiff::Timestamp;
use mockall::automock;
use rust_decimal::Decimal;

use crate::{
    database::Db,
    domain::products::{
        errors::ProductsServiceError,
        models::{NewProduct, Product, ProductUpdate, ProductUuid},
        repository::PgProductsRepository,
    },
};

#[derive(Debug, Clone)]
pub struct PgProductsService {
    db: Db,
    repository: PgProductsRepository,
}

impl PgProductsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProductsRepository::new(),
        }
    }
}

/// Validate percentage bounds, then drop a window that has already elapsed.
///
/// Every catalog write passes through here, which is what keeps elapsed
/// windows from lingering on product rows (the read path treats them as
/// inactive either way).
fn checked_window(
    discount: Option<DiscountWindow>,
    now: Timestamp,
) -> Result<Option<DiscountWindow>, ProductsServiceError> {
    if let Some(window) = &discount {
        if window.percent <= Decimal::ZERO || window.percent > Decimal::ONE_HUNDRED {
            return Err(ProductsServiceError::InvalidDiscount);
        }

        if window.ends_at <= window.starts_at {
            return Err(ProductsServiceError::InvalidDiscount);
        }
    }

    Ok(discounts::normalize(discount, now))
}

#[async_trait]
impl ProductsService for PgProductsService {
    async fn list_products(&self) -> Result<Vec<Product>, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let products = self.repository.list_products(&mut tx).await?;

        tx.commit().await?;

        Ok(products)
    }

    async fn get_product(&self, product: ProductUuid) -> Result<Product, ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, ProductsServiceError> {
        let discount = checked_window(product.discount, Timestamp::now())?;

        let mut tx = self.db.begin().await?;

        let created = self
            .repository
            .create_product(
                &mut tx,
                product.uuid,
                &product.name,
                product.price,
                product.stock_quantity,
                discount,
            )
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<Product, ProductsServiceError> {
        let update = ProductUpdate {
            discount: checked_window(update.discount, Timestamp::now())?,
            ..update
        };

        let mut tx = self.db.begin().await?;

        let updated = self
            .repository
            .update_product(&mut tx, product, update)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_product(&self, product: ProductUuid) -> Result<(), ProductsServiceError> {
        let mut tx = self.db.begin().await?;

        let rows_affected = self.repository.delete_product(&mut tx, product).await?;

        if rows_affected == 0 {
            return Err(ProductsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Retrieves all products.
    async fn list_products(&self) -> Result<Vec<Product>, ProductsServiceError>;

    /// Retrieve a single product.
    async fn get_product(&self, product: ProductUuid) -> Result<Product, ProductsServiceError>;

    /// Creates a new product with the given details.
    async fn create_product(&self, product: NewProduct) -> Result<Product, ProductsServiceError>;

    /// Updates a product's catalog fields. Stock is owned by the stock
    /// ledger and is not writable here.
    async fn update_product(
        &self,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<Product, ProductsServiceError>;

    /// Soft-deletes a product with the given UUID.
    async fn delete_product(&self, product: ProductUuid) -> Result<(), ProductsServiceError>;
}

#[cfg(test)]
mod tests {
    use jiff::ToSpan;
    use testresult::TestResult;

    use crate::test::TestContext;

    use super::*;

    fn window_around_now(percent: u32) -> DiscountWindow {
        let now = Timestamp::now();

        DiscountWindow::new(Decimal::from(percent), now - 1.hour(), now + 1.hour())
    }

    #[tokio::test]
    async fn create_product_returns_correct_fields() -> TestResult {
        let ctx = TestContext::new().await;
        let uuid = ProductUuid::new();

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid,
                name: "Teapot".to_string(),
                price: 15_00,
                stock_quantity: 10,
                discount: None,
            })
            .await?;

        assert_eq!(product.uuid, uuid);
        assert_eq!(product.name, "Teapot");
        assert_eq!(product.price, 15_00);
        assert_eq!(product.stock_quantity, 10);
        assert!(product.discount.is_none());
        assert!(product.deleted_at.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn create_product_persists_active_discount_window() -> TestResult {
        let ctx = TestContext::new().await;
        let window = window_around_now(20);

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: ProductUuid::new(),
                name: "Kettle".to_string(),
                price: 30_00,
                stock_quantity: 5,
                discount: Some(window),
            })
            .await?;

        let stored = product.discount.expect("expected a discount window");

        assert_eq!(stored.percent, Decimal::from(20));
        assert!(stored.is_active_at(Timestamp::now()));

        Ok(())
    }

    #[tokio::test]
    async fn create_product_clears_elapsed_discount_window() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        let elapsed = DiscountWindow::new(Decimal::from(20), now - 2.hours(), now - 1.hour());

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: ProductUuid::new(),
                name: "Old Promo".to_string(),
                price: 10_00,
                stock_quantity: 1,
                discount: Some(elapsed),
            })
            .await?;

        assert!(
            product.discount.is_none(),
            "elapsed window should be normalized away on write"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_product_clears_elapsed_discount_window() -> TestResult {
        let ctx = TestContext::new().await;
        let now = Timestamp::now();

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: ProductUuid::new(),
                name: "Lamp".to_string(),
                price: 20_00,
                stock_quantity: 3,
                discount: Some(window_around_now(10)),
            })
            .await?;

        let elapsed = DiscountWindow::new(Decimal::from(10), now - 2.hours(), now - 1.hour());

        let updated = ctx
            .products
            .update_product(
                product.uuid,
                ProductUpdate {
                    name: product.name,
                    price: product.price,
                    discount: Some(elapsed),
                },
            )
            .await?;

        assert!(updated.discount.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn create_product_rejects_out_of_range_percentages() {
        let ctx = TestContext::new().await;

        for percent in [0, 101] {
            let result = ctx
                .products
                .create_product(NewProduct {
                    uuid: ProductUuid::new(),
                    name: "Bad Promo".to_string(),
                    price: 10_00,
                    stock_quantity: 1,
                    discount: Some(window_around_now(percent)),
                })
                .await;

            assert!(
                matches!(result, Err(ProductsServiceError::InvalidDiscount)),
                "expected InvalidDiscount for {percent}%, got {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn partial_discount_triple_reads_as_no_discount() -> TestResult {
        let ctx = TestContext::new().await;
        let uuid = uuid::Uuid::now_v7();

        // Only one of the three window columns set; can't happen through the
        // service, but old rows may carry it.
        sqlx::query(
            "INSERT INTO products (uuid, name, price, stock_quantity, discount_percent) \
             VALUES ($1, 'Partial', 100, 1, 10)",
        )
        .bind(uuid)
        .execute(ctx.db.pool())
        .await?;

        let product = ctx
            .products
            .get_product(ProductUuid::from_uuid(uuid))
            .await?;

        assert!(
            product.discount.is_none(),
            "partial triple must normalize to no discount on read"
        );

        Ok(())
    }

    #[tokio::test]
    async fn update_product_reflects_new_price() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: ProductUuid::new(),
                name: "Mug".to_string(),
                price: 5_00,
                stock_quantity: 50,
                discount: None,
            })
            .await?;

        let updated = ctx
            .products
            .update_product(
                product.uuid,
                ProductUpdate {
                    name: "Mug".to_string(),
                    price: 7_50,
                    discount: None,
                },
            )
            .await?;

        assert_eq!(updated.price, 7_50);
        assert_eq!(updated.stock_quantity, 50, "update must not touch stock");

        Ok(())
    }

    #[tokio::test]
    async fn get_product_unknown_uuid_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx.products.get_product(ProductUuid::new()).await;

        assert!(
            matches!(result, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn deleted_product_not_returned_in_list() -> TestResult {
        let ctx = TestContext::new().await;

        let product = ctx
            .products
            .create_product(NewProduct {
                uuid: ProductUuid::new(),
                name: "Ephemeral".to_string(),
                price: 1_00,
                stock_quantity: 1,
                discount: None,
            })
            .await?;

        ctx.products.delete_product(product.uuid).await?;

        let products = ctx.products.list_products().await?;

        assert!(
            !products.iter().any(|p| p.uuid == product.uuid),
            "deleted product should not appear in list"
        );

        Ok(())
    }

    #[tokio::test]
    async fn delete_product_unknown_uuid_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx.products.delete_product(ProductUuid::new()).await;

        assert!(
            matches!(result, Err(ProductsServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }
}
