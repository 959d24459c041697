//! Products Repository

use checkout::discounts::DiscountWindow;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::domain::products::models::{Product, ProductUpdate, ProductUuid};

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");
const DELETE_PRODUCT_SQL: &str = include_str!("sql/delete_product.sql");
const PRODUCT_NAMES_SQL: &str = include_str!("sql/product_names.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<Product>, sqlx::Error> {
        query_as::<Postgres, Product>(LIST_PRODUCTS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Like [`Self::get_product`] but absence is a value, not an error, so
    /// callers with their own not-found semantics can map it themselves.
    pub(crate) async fn find_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Option<Product>, sqlx::Error> {
        query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        name: &str,
        price: u64,
        stock_quantity: u64,
        discount: Option<DiscountWindow>,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(CREATE_PRODUCT_SQL)
            .bind(product.into_uuid())
            .bind(name)
            .bind(try_to_db_amount(price, "price")?)
            .bind(try_to_db_amount(stock_quantity, "stock_quantity")?)
            .bind(discount.map(|d| d.percent))
            .bind(discount.map(|d| SqlxTimestamp::from(d.starts_at)))
            .bind(discount.map(|d| SqlxTimestamp::from(d.ends_at)))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(UPDATE_PRODUCT_SQL)
            .bind(product.into_uuid())
            .bind(update.name)
            .bind(try_to_db_amount(update.price, "price")?)
            .bind(update.discount.map(|d| d.percent))
            .bind(update.discount.map(|d| SqlxTimestamp::from(d.starts_at)))
            .bind(update.discount.map(|d| SqlxTimestamp::from(d.ends_at)))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_PRODUCT_SQL)
            .bind(product.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Display names for a set of products, soft-deleted ones included: an
    /// order snapshot still needs the name of a product that has since left
    /// the catalog.
    pub(crate) async fn product_names(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        products: &[Uuid],
    ) -> Result<Vec<(Uuid, String)>, sqlx::Error> {
        let rows = query(PRODUCT_NAMES_SQL)
            .bind(products)
            .fetch_all(&mut **tx)
            .await?;

        rows.into_iter()
            .map(|row| Ok((row.try_get("uuid")?, row.try_get("name")?)))
            .collect()
    }
}

fn try_to_db_amount(amount: u64, col: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn try_get_amount(row: &PgRow, col: &str) -> Result<u64, sqlx::Error> {
    let amount_i64: i64 = row.try_get(col)?;

    u64::try_from(amount_i64).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let percent: Option<Decimal> = row.try_get("discount_percent")?;

        let starts_at = row
            .try_get::<Option<SqlxTimestamp>, _>("discount_starts_at")?
            .map(SqlxTimestamp::to_jiff);

        let ends_at = row
            .try_get::<Option<SqlxTimestamp>, _>("discount_ends_at")?
            .map(SqlxTimestamp::to_jiff);

        // A partially populated window reads as no discount at all.
        let discount = match (percent, starts_at, ends_at) {
            (Some(percent), Some(starts_at), Some(ends_at)) => {
                Some(DiscountWindow::new(percent, starts_at, ends_at))
            }
            _ => None,
        };

        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            price: try_get_amount(row, "price")?,
            stock_quantity: try_get_amount(row, "stock_quantity")?,
            discount,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}
