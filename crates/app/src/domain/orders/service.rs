//! Orders service.
//!
//! The orchestrator: snapshots a cart into an order, drives the status
//! machine, talks to the payment gateway and the stock ledger, and persists
//! the order row exactly once per attempt regardless of outcome.

use std::sync::Arc;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rustc_hash::FxHashMap;
use sqlx::{Postgres, Transaction};
use tracing::{Span, info, warn};
use uuid::Uuid;

use crate::{
    database::Db,
    domain::{
        addresses::PgAddressesRepository,
        carts::{PgCartItemsRepository, PgCartsRepository},
        orders::{
            errors::OrdersServiceError,
            models::{NewOrderItem, Order, OrderStatus, OrderUuid},
            repositories::{PgOrderItemsRepository, PgOrdersRepository, PgPaymentsRepository},
        },
        payments::{
            PaymentGateway,
            models::{NewPayment, PaymentStatus, PaymentUuid},
        },
        products::PgProductsRepository,
        stock::{DecreaseOutcome, PgStockRepository},
        users::models::UserUuid,
    },
};

use crate::domain::addresses::models::AddressUuid;

/// Orders per page for [`OrdersService::list_orders`].
pub const ORDERS_PAGE_SIZE: u32 = 20;

#[derive(Clone)]
pub struct PgOrdersService {
    db: Db,
    gateway: Arc<dyn PaymentGateway>,
    orders_repository: PgOrdersRepository,
    items_repository: PgOrderItemsRepository,
    payments_repository: PgPaymentsRepository,
    carts_repository: PgCartsRepository,
    cart_items_repository: PgCartItemsRepository,
    addresses_repository: PgAddressesRepository,
    products_repository: PgProductsRepository,
    stock_repository: PgStockRepository,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            db,
            gateway,
            orders_repository: PgOrdersRepository::new(),
            items_repository: PgOrderItemsRepository::new(),
            payments_repository: PgPaymentsRepository::new(),
            carts_repository: PgCartsRepository::new(),
            cart_items_repository: PgCartItemsRepository::new(),
            addresses_repository: PgAddressesRepository::new(),
            products_repository: PgProductsRepository::new(),
            stock_repository: PgStockRepository::new(),
        }
    }

    async fn load_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let mut order = self
            .orders_repository
            .find_order(tx, user, order)
            .await?
            .ok_or(OrdersServiceError::NotFound)?;

        order.items = self.items_repository.get_order_items(tx, order.uuid).await?;

        order.payment = self
            .payments_repository
            .find_payment_for_order(tx, order.uuid)
            .await?;

        Ok(order)
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    #[tracing::instrument(
        name = "orders.service.place_order",
        skip(self, method),
        fields(
            user_uuid = %user,
            address_uuid = %address,
            order_uuid = tracing::field::Empty,
            total = tracing::field::Empty
        ),
        err
    )]
    async fn place_order(
        &self,
        user: UserUuid,
        address: AddressUuid,
        method: &str,
    ) -> Result<Order, OrdersServiceError> {
        // Reject before any state exists, not after.
        let method = method
            .parse()
            .map_err(|_| OrdersServiceError::InvalidPaymentMethod)?;

        let mut tx = self.db.begin().await?;

        let cart = self
            .carts_repository
            .get_by_user(&mut tx, user)
            .await?
            .ok_or(OrdersServiceError::EmptyCart)?;

        let lines = self
            .cart_items_repository
            .get_cart_items(&mut tx, cart.uuid)
            .await?;

        if lines.is_empty() {
            return Err(OrdersServiceError::EmptyCart);
        }

        self.addresses_repository
            .find_address(&mut tx, user, address)
            .await?
            .ok_or(OrdersServiceError::AddressNotFound)?;

        let order_uuid = OrderUuid::new();
        let placed_at = Timestamp::now();
        let total = cart.total;

        let span = Span::current();

        span.record("order_uuid", tracing::field::display(order_uuid));
        span.record("total", tracing::field::display(total));

        let status = OrderStatus::Pending.transition(OrderStatus::Processing)?;

        // Freeze the cart lines now; the cart itself stays mutable afterwards.
        let product_uuids: Vec<Uuid> = lines
            .iter()
            .map(|line| line.product_uuid.into_uuid())
            .collect();

        let mut names: FxHashMap<Uuid, String> = self
            .products_repository
            .product_names(&mut tx, &product_uuids)
            .await?
            .into_iter()
            .collect();

        let snapshot: Vec<NewOrderItem> = lines
            .iter()
            .map(|line| {
                let name = names
                    .remove(&line.product_uuid.into_uuid())
                    .unwrap_or_default();

                NewOrderItem::from_cart_line(line, name)
            })
            .collect();

        match self.gateway.authorize(order_uuid, total, method).await {
            Ok(authorization) => {
                let status = status.transition(OrderStatus::Completed)?;

                for line in &lines {
                    let outcome = self
                        .stock_repository
                        .decrease(&mut tx, line.product_uuid, line.quantity)
                        .await?;

                    match outcome {
                        DecreaseOutcome::Decremented(_) => {}
                        DecreaseOutcome::NotFound => {
                            return Err(OrdersServiceError::ProductNotFound);
                        }
                        // Aborts the whole transaction: no order row, no
                        // partial decrement, cart untouched.
                        DecreaseOutcome::Insufficient { available } => {
                            return Err(OrdersServiceError::InsufficientStock {
                                available,
                                requested: u64::from(line.quantity),
                            });
                        }
                    }
                }

                self.cart_items_repository.clear(&mut tx, cart.uuid).await?;
                self.carts_repository.reset_total(&mut tx, cart.uuid).await?;

                let mut order = self
                    .orders_repository
                    .create_order(&mut tx, order_uuid, user, address, status, total, placed_at)
                    .await?;

                order.items = self
                    .items_repository
                    .create_items(&mut tx, order_uuid, &snapshot)
                    .await?;

                order.payment = Some(
                    self.payments_repository
                        .create_payment(
                            &mut tx,
                            NewPayment {
                                uuid: PaymentUuid::new(),
                                order_uuid,
                                amount: total,
                                method,
                                transaction_id: authorization.transaction_id,
                                status: PaymentStatus::Success,
                                paid_at: Timestamp::now(),
                            },
                        )
                        .await?,
                );

                tx.commit().await?;

                info!(order_uuid = %order_uuid, total, "order completed");

                Ok(order)
            }
            Err(_declined) => {
                let status = status.transition(OrderStatus::Failed)?;

                // The attempt is still recorded: stock and cart are left
                // alone, but the failed order row commits and stays
                // queryable.
                let mut order = self
                    .orders_repository
                    .create_order(&mut tx, order_uuid, user, address, status, total, placed_at)
                    .await?;

                order.items = self
                    .items_repository
                    .create_items(&mut tx, order_uuid, &snapshot)
                    .await?;

                tx.commit().await?;

                warn!(order_uuid = %order_uuid, total, "payment declined");

                Err(OrdersServiceError::PaymentFailed { order: order_uuid })
            }
        }
    }

    #[tracing::instrument(
        name = "orders.service.cancel_order",
        skip(self),
        fields(user_uuid = %user, order_uuid = %order),
        err
    )]
    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, user, order).await?;

        if order.status == OrderStatus::Cancelled {
            return Err(OrdersServiceError::AlreadyCancelled);
        }

        let status = order.status.transition(OrderStatus::Cancelled)?;

        // Stock is restored only when it was actually taken. Cancelling a
        // failed or still-pending order must not credit inventory it never
        // consumed.
        if order.status == OrderStatus::Completed {
            for item in &order.items {
                self.stock_repository
                    .increase(&mut tx, item.product_uuid, item.quantity)
                    .await?
                    .ok_or(OrdersServiceError::ProductNotFound)?;
            }
        }

        let mut cancelled = self
            .orders_repository
            .update_status(&mut tx, user, order.uuid, status)
            .await?;

        tx.commit().await?;

        info!(order_uuid = %order.uuid, previous = %order.status, "order cancelled");

        cancelled.items = order.items;
        cancelled.payment = order.payment;

        Ok(cancelled)
    }

    async fn get_order(&self, user: UserUuid, order: OrderUuid) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let order = self.load_order(&mut tx, user, order).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn list_orders(&self, user: UserUuid, page: u32) -> Result<Vec<Order>, OrdersServiceError> {
        let mut tx = self.db.begin().await?;

        let mut orders = self
            .orders_repository
            .list_orders(
                &mut tx,
                user,
                i64::from(ORDERS_PAGE_SIZE),
                i64::from(page) * i64::from(ORDERS_PAGE_SIZE),
            )
            .await?;

        let order_uuids: Vec<Uuid> = orders.iter().map(|o| o.uuid.into_uuid()).collect();

        let items = self
            .items_repository
            .get_items_for_orders(&mut tx, &order_uuids)
            .await?;

        let payments = self
            .payments_repository
            .find_payments_for_orders(&mut tx, &order_uuids)
            .await?;

        tx.commit().await?;

        let mut items_by_order: FxHashMap<Uuid, Vec<_>> = FxHashMap::default();

        for item in items {
            items_by_order
                .entry(item.order_uuid.into_uuid())
                .or_default()
                .push(item);
        }

        let mut payments_by_order: FxHashMap<Uuid, _> = payments
            .into_iter()
            .map(|payment| (payment.order_uuid.into_uuid(), payment))
            .collect();

        for order in &mut orders {
            if let Some(items) = items_by_order.remove(&order.uuid.into_uuid()) {
                order.items = items;
            }

            order.payment = payments_by_order.remove(&order.uuid.into_uuid());
        }

        Ok(orders)
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Turn the user's cart into an order.
    ///
    /// On success the order commits as `completed` with stock decremented
    /// and the cart cleared. On a gateway decline the order still commits,
    /// as `failed`, with stock and cart untouched, and
    /// [`OrdersServiceError::PaymentFailed`] is returned.
    async fn place_order(
        &self,
        user: UserUuid,
        address: AddressUuid,
        method: &str,
    ) -> Result<Order, OrdersServiceError>;

    /// Cancel an order in any non-cancelled state, restoring stock for
    /// orders that had actually consumed it.
    async fn cancel_order(
        &self,
        user: UserUuid,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Retrieve one of the user's orders with items and payment.
    async fn get_order(&self, user: UserUuid, order: OrderUuid)
    -> Result<Order, OrdersServiceError>;

    /// The user's orders, newest first, [`ORDERS_PAGE_SIZE`] per page
    /// (`page` is zero-based).
    async fn list_orders(&self, user: UserUuid, page: u32)
    -> Result<Vec<Order>, OrdersServiceError>;
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::{
        domain::{
            carts::CartsService,
            payments::{SimulatedGateway, models::PaymentMethod},
            products::ProductsService,
            stock::StockService,
        },
        test::{TestContext, helpers},
    };

    use super::*;

    #[tokio::test]
    async fn place_order_completes_and_settles_all_three_ledgers() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;

        let product_a = helpers::create_product(&ctx, "A", 100, 10).await?;
        let product_b = helpers::create_product(&ctx, "B", 50, 5).await?;

        ctx.carts.add_item(ctx.user_uuid, product_a.uuid, 3).await?;
        ctx.carts.add_item(ctx.user_uuid, product_b.uuid, 2).await?;

        let order = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await?;

        assert_eq!(order.status, OrderStatus::Completed);
        assert_eq!(order.total, 400);
        assert_eq!(order.items.len(), 2);

        let payment = order.payment.expect("completed order carries a payment");

        assert_eq!(payment.amount, 400);
        assert_eq!(payment.method, PaymentMethod::Card);
        assert_eq!(payment.status, PaymentStatus::Success);
        assert!(payment.transaction_id.starts_with("txn_"));

        // Stock decremented per line.
        assert_eq!(ctx.products.get_product(product_a.uuid).await?.stock_quantity, 7);
        assert_eq!(ctx.products.get_product(product_b.uuid).await?.stock_quantity, 3);

        // Cart cleared.
        let cart = ctx.carts.get_cart(ctx.user_uuid).await?;

        assert!(cart.items.is_empty());
        assert_eq!(cart.total, 0);

        Ok(())
    }

    #[tokio::test]
    async fn placed_order_snapshot_survives_catalog_changes() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "Stable", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 2).await?;

        let order = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await?;

        helpers::set_price(&ctx, product.uuid, 999).await?;

        let reloaded = ctx.orders.get_order(ctx.user_uuid, order.uuid).await?;
        let line = reloaded.items.first().expect("order has one line");

        assert_eq!(line.unit_price, 100);
        assert_eq!(line.line_total, 200);
        assert_eq!(line.product_name, "Stable");
        assert_eq!(reloaded.total, 200);

        Ok(())
    }

    #[tokio::test]
    async fn place_order_freezes_discount_snapshot() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_discounted_product(&ctx, "Promo", 100, 10, 20).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 5).await?;

        let order = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "wallet")
            .await?;

        assert_eq!(order.total, 400);

        let line = order.items.first().expect("order has one line");

        assert!(line.discount_applied);
        assert_eq!(line.discounted_unit_price, 80);
        assert_eq!(line.total_discount, 100);
        assert_eq!(line.effective_line_total(), 400);

        Ok(())
    }

    #[tokio::test]
    async fn place_order_empty_cart_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;

        // No cart at all.
        let result = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );

        // A cart that exists but has no lines.
        ctx.carts.get_cart(ctx.user_uuid).await?;

        let result = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn place_order_rejects_unknown_payment_method_before_any_state() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 1).await?;

        let result = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "carrier-pigeon")
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::InvalidPaymentMethod)),
            "expected InvalidPaymentMethod, got {result:?}"
        );

        // Nothing was created or touched.
        assert!(ctx.orders.list_orders(ctx.user_uuid, 0).await?.is_empty());
        assert_eq!(ctx.carts.get_cart(ctx.user_uuid).await?.total, 100);

        Ok(())
    }

    #[tokio::test]
    async fn place_order_rejects_foreign_address() -> TestResult {
        let ctx = TestContext::new().await;
        let product = helpers::create_product(&ctx, "P", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 1).await?;

        let other_user = ctx.create_user("neighbour").await;
        let foreign_address = helpers::create_address(&ctx, other_user).await?;

        let result = ctx
            .orders
            .place_order(ctx.user_uuid, foreign_address.uuid, "card")
            .await;

        assert!(
            matches!(result, Err(OrdersServiceError::AddressNotFound)),
            "expected AddressNotFound, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn declined_payment_persists_failed_order_and_touches_nothing_else() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 4).await?;

        let declining = ctx.orders_with_gateway(Arc::new(SimulatedGateway::declining()));

        let result = declining
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await;

        let Err(OrdersServiceError::PaymentFailed { order }) = result else {
            panic!("expected PaymentFailed, got {result:?}");
        };

        // The failed attempt is recorded and queryable.
        let failed = ctx.orders.get_order(ctx.user_uuid, order).await?;

        assert_eq!(failed.status, OrderStatus::Failed);
        assert_eq!(failed.total, 400);
        assert_eq!(failed.items.len(), 1);
        assert!(failed.payment.is_none(), "no payment row for a decline");

        // Stock untouched, cart intact.
        assert_eq!(ctx.products.get_product(product.uuid).await?.stock_quantity, 10);

        let cart = ctx.carts.get_cart(ctx.user_uuid).await?;

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.total, 400);

        Ok(())
    }

    #[tokio::test]
    async fn insufficient_stock_at_checkout_aborts_without_an_order() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 5).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 3).await?;

        // Stock drains between carting and checkout.
        ctx.stock.decrease(product.uuid, 4).await?;

        let result = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await;

        assert!(
            matches!(
                result,
                Err(OrdersServiceError::InsufficientStock {
                    available: 1,
                    requested: 3
                })
            ),
            "expected InsufficientStock, got {result:?}"
        );

        // Whole attempt rolled back: no order row, stock and cart unchanged.
        assert!(ctx.orders.list_orders(ctx.user_uuid, 0).await?.is_empty());
        assert_eq!(ctx.products.get_product(product.uuid).await?.stock_quantity, 1);
        assert_eq!(ctx.carts.get_cart(ctx.user_uuid).await?.items.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn cancel_completed_order_restores_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 3).await?;

        let order = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await?;

        assert_eq!(ctx.products.get_product(product.uuid).await?.stock_quantity, 7);

        let cancelled = ctx.orders.cancel_order(ctx.user_uuid, order.uuid).await?;

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(
            ctx.products.get_product(product.uuid).await?.stock_quantity,
            10,
            "place-then-cancel must conserve stock exactly"
        );

        Ok(())
    }

    #[tokio::test]
    async fn cancel_conserves_stock_for_every_line() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product_a = helpers::create_product(&ctx, "A", 100, 8).await?;
        let product_b = helpers::create_product(&ctx, "B", 30, 6).await?;

        ctx.carts.add_item(ctx.user_uuid, product_a.uuid, 5).await?;
        ctx.carts.add_item(ctx.user_uuid, product_b.uuid, 6).await?;

        let order = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "bank-transfer")
            .await?;

        ctx.orders.cancel_order(ctx.user_uuid, order.uuid).await?;

        assert_eq!(ctx.products.get_product(product_a.uuid).await?.stock_quantity, 8);
        assert_eq!(ctx.products.get_product(product_b.uuid).await?.stock_quantity, 6);

        Ok(())
    }

    #[tokio::test]
    async fn cancel_of_cancelled_order_is_rejected() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 1).await?;

        let order = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await?;

        ctx.orders.cancel_order(ctx.user_uuid, order.uuid).await?;

        let result = ctx.orders.cancel_order(ctx.user_uuid, order.uuid).await;

        assert!(
            matches!(result, Err(OrdersServiceError::AlreadyCancelled)),
            "expected AlreadyCancelled, got {result:?}"
        );

        // And the repeated attempt must not have touched stock again.
        assert_eq!(ctx.products.get_product(product.uuid).await?.stock_quantity, 10);

        Ok(())
    }

    #[tokio::test]
    async fn cancel_failed_order_does_not_restore_stock() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 4).await?;

        let declining = ctx.orders_with_gateway(Arc::new(SimulatedGateway::declining()));

        let Err(OrdersServiceError::PaymentFailed { order }) = declining
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await
        else {
            panic!("expected PaymentFailed");
        };

        let cancelled = ctx.orders.cancel_order(ctx.user_uuid, order).await?;

        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        // The failed order never took stock, so cancelling it must not
        // credit any back.
        assert_eq!(ctx.products.get_product(product.uuid).await?.stock_quantity, 10);

        Ok(())
    }

    #[tokio::test]
    async fn get_order_scopes_to_owner() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 10).await?;

        ctx.carts.add_item(ctx.user_uuid, product.uuid, 1).await?;

        let order = ctx
            .orders
            .place_order(ctx.user_uuid, address.uuid, "card")
            .await?;

        let other_user = ctx.create_user("snoop").await;

        let result = ctx.orders.get_order(other_user, order.uuid).await;

        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound for foreign order, got {result:?}"
        );

        Ok(())
    }

    #[tokio::test]
    async fn get_order_unknown_uuid_returns_not_found() {
        let ctx = TestContext::new().await;

        let result = ctx.orders.get_order(ctx.user_uuid, OrderUuid::new()).await;

        assert!(
            matches!(result, Err(OrdersServiceError::NotFound)),
            "expected NotFound, got {result:?}"
        );
    }

    #[tokio::test]
    async fn list_orders_returns_newest_first_with_items() -> TestResult {
        let ctx = TestContext::new().await;
        let address = helpers::create_address(&ctx, ctx.user_uuid).await?;
        let product = helpers::create_product(&ctx, "P", 100, 100).await?;

        let mut placed = Vec::new();

        for quantity in [1, 2, 3] {
            ctx.carts
                .add_item(ctx.user_uuid, product.uuid, quantity)
                .await?;

            placed.push(
                ctx.orders
                    .place_order(ctx.user_uuid, address.uuid, "card")
                    .await?,
            );
        }

        let orders = ctx.orders.list_orders(ctx.user_uuid, 0).await?;

        assert_eq!(orders.len(), 3);

        // Newest first.
        assert_eq!(
            orders.first().map(|o| o.uuid),
            placed.last().map(|o| o.uuid)
        );

        for order in &orders {
            assert_eq!(order.items.len(), 1);
            assert!(order.payment.is_some());
        }

        // Past the end.
        assert!(ctx.orders.list_orders(ctx.user_uuid, 1).await?.is_empty());

        Ok(())
    }
}
