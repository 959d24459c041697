//! Payments Repository
//!
//! Payment rows belong to the order aggregate; they are written in the same
//! transaction that persists the order.

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query_as};
use uuid::Uuid;

use crate::domain::{
    orders::models::OrderUuid,
    payments::models::{NewPayment, Payment, PaymentMethod, PaymentStatus, PaymentUuid},
    products::try_get_amount,
};

const CREATE_PAYMENT_SQL: &str = include_str!("../sql/create_payment.sql");
const FIND_PAYMENT_FOR_ORDER_SQL: &str = include_str!("../sql/find_payment_for_order.sql");
const FIND_PAYMENTS_FOR_ORDERS_SQL: &str = include_str!("../sql/find_payments_for_orders.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgPaymentsRepository;

impl PgPaymentsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn create_payment(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        payment: NewPayment,
    ) -> Result<Payment, sqlx::Error> {
        let amount = i64::try_from(payment.amount).map_err(|e| sqlx::Error::ColumnDecode {
            index: "amount".to_string(),
            source: Box::new(e),
        })?;

        query_as::<Postgres, Payment>(CREATE_PAYMENT_SQL)
            .bind(payment.uuid.into_uuid())
            .bind(payment.order_uuid.into_uuid())
            .bind(amount)
            .bind(payment.method.as_str())
            .bind(payment.transaction_id)
            .bind(payment.status.as_str())
            .bind(SqlxTimestamp::from(payment.paid_at))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn find_payment_for_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Option<Payment>, sqlx::Error> {
        query_as::<Postgres, Payment>(FIND_PAYMENT_FOR_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn find_payments_for_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        orders: &[Uuid],
    ) -> Result<Vec<Payment>, sqlx::Error> {
        query_as::<Postgres, Payment>(FIND_PAYMENTS_FOR_ORDERS_SQL)
            .bind(orders)
            .fetch_all(&mut **tx)
            .await
    }
}

fn parse_column<T>(value: Result<T, T::Err>, col: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for Payment {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let method: String = row.try_get("method")?;
        let status: String = row.try_get("status")?;

        Ok(Self {
            uuid: PaymentUuid::from_uuid(row.try_get("uuid")?),
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            amount: try_get_amount(row, "amount")?,
            method: parse_column(method.parse::<PaymentMethod>(), "method")?,
            transaction_id: row.try_get("transaction_id")?,
            status: parse_column(status.parse::<PaymentStatus>(), "status")?,
            paid_at: row.try_get::<SqlxTimestamp, _>("paid_at")?.to_jiff(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
        })
    }
}
