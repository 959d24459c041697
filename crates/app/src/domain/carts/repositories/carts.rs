//! Carts Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::domain::{
    carts::models::{Cart, CartUuid},
    products::try_get_amount,
    users::models::UserUuid,
};

const GET_CART_BY_USER_SQL: &str = include_str!("../sql/get_cart_by_user.sql");
const INSERT_CART_SQL: &str = include_str!("../sql/insert_cart.sql");
const APPLY_TOTAL_DELTA_SQL: &str = include_str!("../sql/apply_total_delta.sql");
const RESET_TOTAL_SQL: &str = include_str!("../sql/reset_total.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_by_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<Cart>, sqlx::Error> {
        query_as::<Postgres, Cart>(GET_CART_BY_USER_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    /// Insert a cart row for the user unless one already exists. Safe to race:
    /// the unique key on `user_uuid` makes the second writer a no-op.
    pub(crate) async fn insert_if_absent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        user: UserUuid,
    ) -> Result<(), sqlx::Error> {
        query(INSERT_CART_SQL)
            .bind(cart.into_uuid())
            .bind(user.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Apply a signed delta to the cached total; returns the new total.
    pub(crate) async fn apply_total_delta(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        delta: i64,
    ) -> Result<u64, sqlx::Error> {
        let row = query(APPLY_TOTAL_DELTA_SQL)
            .bind(cart.into_uuid())
            .bind(delta)
            .fetch_one(&mut **tx)
            .await?;

        try_get_amount(&row, "total")
    }

    pub(crate) async fn reset_total(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<(), sqlx::Error> {
        query(RESET_TOTAL_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Cart {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            total: try_get_amount(row, "total")?,
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}
