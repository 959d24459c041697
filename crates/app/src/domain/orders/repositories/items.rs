//! Order Items Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::{
    orders::models::{NewOrderItem, OrderItem, OrderItemUuid, OrderUuid},
    products::{models::ProductUuid, try_get_amount},
};

const CREATE_ORDER_ITEM_SQL: &str = include_str!("../sql/create_order_item.sql");
const GET_ORDER_ITEMS_SQL: &str = include_str!("../sql/get_order_items.sql");
const GET_ITEMS_FOR_ORDERS_SQL: &str = include_str!("../sql/get_items_for_orders.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrderItemsRepository;

impl PgOrderItemsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        let mut created = Vec::with_capacity(items.len());

        for item in items {
            let row = query_as::<Postgres, OrderItem>(CREATE_ORDER_ITEM_SQL)
                .bind(item.uuid.into_uuid())
                .bind(order.into_uuid())
                .bind(item.product_uuid.into_uuid())
                .bind(&item.product_name)
                .bind(i64::from(item.quantity))
                .bind(db_amount(item.unit_price, "unit_price")?)
                .bind(db_amount(item.line_total, "line_total")?)
                .bind(item.discount_applied)
                .bind(db_amount(item.discount_per_unit, "discount_per_unit")?)
                .bind(db_amount(item.total_discount, "total_discount")?)
                .bind(db_amount(
                    item.discounted_unit_price,
                    "discounted_unit_price",
                )?)
                .bind(db_amount(
                    item.discounted_line_total,
                    "discounted_line_total",
                )?)
                .fetch_one(&mut **tx)
                .await?;

            created.push(row);
        }

        Ok(created)
    }

    pub(crate) async fn get_order_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        query_as::<Postgres, OrderItem>(GET_ORDER_ITEMS_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_items_for_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        orders: &[Uuid],
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        query_as::<Postgres, OrderItem>(GET_ITEMS_FOR_ORDERS_SQL)
            .bind(orders)
            .fetch_all(&mut **tx)
            .await
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

impl<'r> FromRow<'r, PgRow> for OrderItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderItemUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            product_name: row.try_get("product_name")?,
            quantity: try_get_quantity(row)?,
            unit_price: try_get_amount(row, "unit_price")?,
            line_total: try_get_amount(row, "line_total")?,
            discount_applied: row.try_get("discount_applied")?,
            discount_per_unit: try_get_amount(row, "discount_per_unit")?,
            total_discount: try_get_amount(row, "total_discount")?,
            discounted_unit_price: try_get_amount(row, "discounted_unit_price")?,
            discounted_line_total: try_get_amount(row, "discounted_line_total")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
