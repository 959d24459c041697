//! Cart Items Repository

use checkout::pricing::LinePricing;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    carts::models::{CartItem, CartItemUuid, CartUuid},
    products::{models::ProductUuid, try_get_amount},
};

const GET_CART_ITEMS_SQL: &str = include_str!("../sql/get_cart_items.sql");
const FIND_ITEM_BY_PRODUCT_SQL: &str = include_str!("../sql/find_item_by_product.sql");
const GET_CART_ITEM_SQL: &str = include_str!("../sql/get_cart_item.sql");
const UPSERT_CART_ITEM_SQL: &str = include_str!("../sql/upsert_cart_item.sql");
const UPDATE_CART_ITEM_SQL: &str = include_str!("../sql/update_cart_item.sql");
const DELETE_CART_ITEM_SQL: &str = include_str!("../sql/delete_cart_item.sql");
const CLEAR_CART_ITEMS_SQL: &str = include_str!("../sql/clear_cart_items.sql");
const COUNT_CART_ITEMS_SQL: &str = include_str!("../sql/count_cart_items.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartItemsRepository;

impl PgCartItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_cart_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Vec<CartItem>, sqlx::Error> {
        query_as::<Postgres, CartItem>(GET_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn find_by_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        product: ProductUuid,
    ) -> Result<Option<CartItem>, sqlx::Error> {
        query_as::<Postgres, CartItem>(FIND_ITEM_BY_PRODUCT_SQL)
            .bind(cart.into_uuid())
            .bind(product.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn get_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<Option<CartItem>, sqlx::Error> {
        query_as::<Postgres, CartItem>(GET_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(cart.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Insert a line or, when the product is already in the cart, replace its
    /// quantity and snapshot. The existing row keeps its original UUID.
    pub(crate) async fn upsert_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CartItemUuid,
        cart: CartUuid,
        product: ProductUuid,
        pricing: &LinePricing,
    ) -> Result<CartItem, sqlx::Error> {
        query_as::<Postgres, CartItem>(UPSERT_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(cart.into_uuid())
            .bind(product.into_uuid())
            .bind(i64::from(pricing.product.quantity))
            .bind(db_amount(pricing.product.unit_price, "unit_price")?)
            .bind(db_amount(pricing.product.line_total, "line_total")?)
            .bind(pricing.discount.applied)
            .bind(db_amount(pricing.discount.per_unit, "discount_per_unit")?)
            .bind(db_amount(pricing.discount.total, "total_discount")?)
            .bind(db_amount(
                pricing.discount.discounted_unit_price,
                "discounted_unit_price",
            )?)
            .bind(db_amount(
                pricing.discount.discounted_line_total,
                "discounted_line_total",
            )?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        item: CartItemUuid,
        pricing: &LinePricing,
    ) -> Result<CartItem, sqlx::Error> {
        query_as::<Postgres, CartItem>(UPDATE_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(i64::from(pricing.product.quantity))
            .bind(db_amount(pricing.product.unit_price, "unit_price")?)
            .bind(db_amount(pricing.product.line_total, "line_total")?)
            .bind(pricing.discount.applied)
            .bind(db_amount(pricing.discount.per_unit, "discount_per_unit")?)
            .bind(db_amount(pricing.discount.total, "total_discount")?)
            .bind(db_amount(
                pricing.discount.discounted_unit_price,
                "discounted_unit_price",
            )?)
            .bind(db_amount(
                pricing.discount.discounted_line_total,
                "discounted_line_total",
            )?)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_item(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        item: CartItemUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_CART_ITEM_SQL)
            .bind(item.into_uuid())
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn clear(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(CLEAR_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    pub(crate) async fn count(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<u64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(COUNT_CART_ITEMS_SQL)
            .bind(cart.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        u64::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
            index: "count".to_string(),
            source: Box::new(e),
        })
    }
}

fn db_amount(amount: u64, col: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

fn try_get_quantity(row: &PgRow) -> Result<u32, sqlx::Error> {
    let quantity: i64 = row.try_get("quantity")?;

    u32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
        index: "quantity".to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for CartItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartItemUuid::from_uuid(row.try_get("uuid")?),
            cart_uuid: CartUuid::from_uuid(row.try_get("cart_uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            quantity: try_get_quantity(row)?,
            unit_price: try_get_amount(row, "unit_price")?,
            line_total: try_get_amount(row, "line_total")?,
            discount_applied: row.try_get("discount_applied")?,
            discount_per_unit: try_get_amount(row, "discount_per_unit")?,
            total_discount: try_get_amount(row, "total_discount")?,
            discounted_unit_price: try_get_amount(row, "discounted_unit_price")?,
            discounted_line_total: try_get_amount(row, "discounted_line_total")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
