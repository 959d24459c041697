//! Stock Repository
//!
//! Read-modify-write on the stock column happens as single guarded UPDATE
//! statements, so sufficiency is re-validated under the row lock at write
//! time; a check against a stale read can never oversell.

use sqlx::{Postgres, Row, Transaction, query, query_scalar};

use crate::domain::products::{models::ProductUuid, try_get_amount};

const GET_STOCK_SQL: &str = include_str!("sql/get_stock.sql");
const INCREASE_STOCK_SQL: &str = include_str!("sql/increase_stock.sql");
const DECREASE_STOCK_SQL: &str = include_str!("sql/decrease_stock.sql");

/// Result of a guarded decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecreaseOutcome {
    /// Stock was decremented; carries the new level.
    Decremented(u64),

    /// No such product.
    NotFound,

    /// The product exists but holds fewer units than requested.
    Insufficient { available: u64 },
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgStockRepository;

impl PgStockRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn available(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Option<u64>, sqlx::Error> {
        let stock: Option<i64> = query_scalar(GET_STOCK_SQL)
            .bind(product.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        stock
            .map(|s| {
                u64::try_from(s).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "stock_quantity".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()
    }

    pub(crate) async fn increase(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<Option<u64>, sqlx::Error> {
        let row = query(INCREASE_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(i64::from(quantity))
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|row| try_get_amount(&row, "stock_quantity"))
            .transpose()
    }

    pub(crate) async fn decrease(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<DecreaseOutcome, sqlx::Error> {
        let row = query(DECREASE_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(i64::from(quantity))
            .fetch_optional(&mut **tx)
            .await?;

        if let Some(row) = row {
            return Ok(DecreaseOutcome::Decremented(try_get_amount(
                &row,
                "stock_quantity",
            )?));
        }

        // The guard refused: either the product is gone or it is short.
        match self.available(tx, product).await? {
            None => Ok(DecreaseOutcome::NotFound),
            Some(available) => Ok(DecreaseOutcome::Insufficient { available }),
        }
    }
}
