//! Carts service.

use async_trait::async_trait;
use checkout::{
    prices::Price,
    pricing::{PricingError, price_line},
};
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};
use tracing::Span;

use crate::{
    database::Db,
    domain::{
        carts::{
            errors::CartsServiceError,
            models::{Cart, CartItem, CartItemUuid, CartSummary, CartUuid},
            repositories::{PgCartItemsRepository, PgCartsRepository},
        },
        products::{PgProductsRepository, models::ProductUuid},
        stock::PgStockRepository,
        users::models::UserUuid,
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    carts_repository: PgCartsRepository,
    items_repository: PgCartItemsRepository,
    products_repository: PgProductsRepository,
    stock_repository: PgStockRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            carts_repository: PgCartsRepository::new(),
            items_repository: PgCartItemsRepository::new(),
            products_repository: PgProductsRepository::new(),
            stock_repository: PgStockRepository::new(),
        }
    }

    /// Carts are created lazily on first access, one per user.
    async fn get_or_create(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Cart, CartsServiceError> {
        if let Some(cart) = self.carts_repository.get_by_user(tx, user).await? {
            return Ok(cart);
        }

        self.carts_repository
            .insert_if_absent(tx, CartUuid::new(), user)
            .await?;

        self.carts_repository
            .get_by_user(tx, user)
            .await?
            .ok_or(CartsServiceError::Sql(sqlx::Error::RowNotFound))
    }

    async fn require_available(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        requested: u32,
    ) -> Result<(), CartsServiceError> {
        let available = self
            .stock_repository
            .available(tx, product)
            .await?
            .ok_or(CartsServiceError::ProductNotFound)?;

        if available < u64::from(requested) {
            return Err(CartsServiceError::InsufficientStock {
                available,
                requested: u64::from(requested),
            });
        }

        Ok(())
    }
}

/// `new - old` as a signed delta. Derived from the two effective totals, not
/// from the quantity direction: a reprice can move the total down while the
/// quantity goes up.
fn signed_delta(new_total: u64, old_total: u64) -> Result<i64, CartsServiceError> {
    let new_total = i64::try_from(new_total).map_err(|_| PricingError::Overflow)?;
    let old_total = i64::try_from(old_total).map_err(|_| PricingError::Overflow)?;

    Ok(new_total - old_total)
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(&self, user: UserUuid) -> Result<Cart, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let mut cart = self.get_or_create(&mut tx, user).await?;

        let items = self.items_repository.get_cart_items(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        cart.items.extend(items);

        Ok(cart)
    }

    async fn get_cart_summary(&self, user: UserUuid) -> Result<CartSummary, CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self.get_or_create(&mut tx, user).await?;
        let item_count = self.items_repository.count(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(CartSummary {
            cart_uuid: cart.uuid,
            item_count,
            total: cart.total,
        })
    }

    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self),
        fields(user_uuid = %user, product_uuid = %product, cart_uuid = tracing::field::Empty),
        err
    )]
    async fn add_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<CartItem, CartsServiceError> {
        if quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let cart = self.get_or_create(&mut tx, user).await?;

        Span::current().record("cart_uuid", tracing::field::display(cart.uuid));

        let product = self
            .products_repository
            .find_product(&mut tx, product)
            .await?
            .ok_or(CartsServiceError::ProductNotFound)?;

        let existing = self
            .items_repository
            .find_by_product(&mut tx, cart.uuid, product.uuid)
            .await?;

        // Re-adding an in-cart product re-validates the merged demand, not
        // just the increment.
        let merged = existing
            .as_ref()
            .map_or(0, |item| item.quantity)
            .checked_add(quantity)
            .ok_or(PricingError::Overflow)?;

        self.require_available(&mut tx, product.uuid, merged).await?;

        let pricing = price_line(
            merged,
            Price::new(product.price),
            product.discount.as_ref(),
            Timestamp::now(),
        )?;

        let old_total = existing.as_ref().map_or(0, CartItem::effective_line_total);

        let item_uuid = existing
            .as_ref()
            .map_or_else(CartItemUuid::new, |item| item.uuid);

        let item = self
            .items_repository
            .upsert_item(&mut tx, item_uuid, cart.uuid, product.uuid, &pricing)
            .await?;

        let delta = signed_delta(pricing.total(), old_total)?;

        self.carts_repository
            .apply_total_delta(&mut tx, cart.uuid, delta)
            .await?;

        tx.commit().await?;

        Ok(item)
    }

    #[tracing::instrument(
        name = "carts.service.update_item_quantity",
        skip(self),
        fields(user_uuid = %user, item_uuid = %item, quantity),
        err
    )]
    async fn update_item_quantity(
        &self,
        user: UserUuid,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<CartItem, CartsServiceError> {
        if quantity == 0 {
            return Err(CartsServiceError::InvalidQuantity);
        }

        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .get_by_user(&mut tx, user)
            .await?
            .ok_or(CartsServiceError::ItemNotFound)?;

        let item = self
            .items_repository
            .get_item(&mut tx, cart.uuid, item)
            .await?
            .ok_or(CartsServiceError::ItemNotFound)?;

        let product = self
            .products_repository
            .find_product(&mut tx, item.product_uuid)
            .await?
            .ok_or(CartsServiceError::ProductNotFound)?;

        // Absolute demand, not the delta from the current quantity.
        self.require_available(&mut tx, product.uuid, quantity).await?;

        let pricing = price_line(
            quantity,
            Price::new(product.price),
            product.discount.as_ref(),
            Timestamp::now(),
        )?;

        let updated = self
            .items_repository
            .update_item(&mut tx, item.uuid, &pricing)
            .await?;

        let delta = signed_delta(pricing.total(), item.effective_line_total())?;

        self.carts_repository
            .apply_total_delta(&mut tx, cart.uuid, delta)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(
        name = "carts.service.remove_item",
        skip(self),
        fields(user_uuid = %user, item_uuid = %item),
        err
    )]
    async fn remove_item(&self, user: UserUuid, item: CartItemUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .get_by_user(&mut tx, user)
            .await?
            .ok_or(CartsServiceError::ItemNotFound)?;

        let item = self
            .items_repository
            .get_item(&mut tx, cart.uuid, item)
            .await?
            .ok_or(CartsServiceError::ItemNotFound)?;

        self.items_repository
            .delete_item(&mut tx, cart.uuid, item.uuid)
            .await?;

        let delta = signed_delta(0, item.effective_line_total())?;

        self.carts_repository
            .apply_total_delta(&mut tx, cart.uuid, delta)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn clear_cart(&self, user: UserUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin().await?;

        let Some(cart) = self.carts_repository.get_by_user(&mut tx, user).await? else {
            return Ok(());
        };

        self.items_repository.clear(&mut tx, cart.uuid).await?;
        self.carts_repository.reset_total(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the user's cart, creating an empty one on first access.
    async fn get_cart(&self, user: UserUuid) -> Result<Cart, CartsServiceError>;

    /// Item count and cached total without loading the lines.
    async fn get_cart_summary(&self, user: UserUuid) -> Result<CartSummary, CartsServiceError>;

    /// Add `quantity` units of a product, merging with an existing line for
    /// the same product. Availability is checked against the merged quantity.
    async fn add_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<CartItem, CartsServiceError>;

    /// Set a line to an absolute quantity and reprice it against the current
    /// catalog state.
    async fn update_item_quantity(
        &self,
        user: UserUuid,
        item: CartItemUuid,
        quantity: u32,
    ) -> Result<CartItem, CartsServiceError>;

    /// Remove a line entirely.
    async fn remove_item(&self, user: UserUuid, item: CartItemUuid)
    -> Result<(), CartsServiceError>;

    /// Remove every line and reset the cached total to zero.
    async fn clear_cart(&self, user: UserUuid) -> Result<(), CartsServiceError>;
}
