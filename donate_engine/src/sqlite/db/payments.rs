use chrono::Utc;
use dpg_common::Rubles;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPayment, Payment, PaymentStatusType, PAYMENT_PROVIDER},
    traits::StorefrontDbError,
};

pub async fn insert_payment(
    order_id: i64,
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<Payment, StorefrontDbError> {
    let external_id = payment.external_id.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, provider, amount, currency, status, external_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'Pending', $5, $6, $6)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(PAYMENT_PROVIDER)
    .bind(payment.amount)
    .bind(payment.currency)
    .bind(payment.external_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(payment) => Ok(payment),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(StorefrontDbError::PaymentAlreadyExists(external_id))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_payment_by_external_id(
    external_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE external_id = $1").bind(external_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn fetch_payment_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Payment>, sqlx::Error> {
    let payment = sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(payment)
}

/// Set the payment status, optionally updating the amount at the same time (the webhook writes the
/// provider-reported cost as the authoritative amount).
pub(crate) async fn update_payment_status(
    id: i64,
    status: PaymentStatusType,
    amount: Option<Rubles>,
    conn: &mut SqliteConnection,
) -> Result<Payment, StorefrontDbError> {
    let result: Option<Payment> = match amount {
        Some(amount) => {
            sqlx::query_as("UPDATE payments SET status = $1, amount = $2, updated_at = $3 WHERE id = $4 RETURNING *")
                .bind(status.to_string())
                .bind(amount)
                .bind(Utc::now())
                .bind(id)
                .fetch_optional(conn)
                .await?
        },
        None => sqlx::query_as("UPDATE payments SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(status.to_string())
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(conn)
            .await?,
    };
    result.ok_or(StorefrontDbError::PaymentNotFound(id.to_string()))
}

/// Cancel the pending payments attached to the given orders. Part of the expiry sweep transaction.
pub(crate) async fn cancel_pending_payments_for_orders(
    order_ids: &[i64],
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    if order_ids.is_empty() {
        return Ok(0);
    }
    let mut builder = QueryBuilder::new("UPDATE payments SET status = 'Cancelled', updated_at = ");
    builder.push_bind(Utc::now());
    builder.push(" WHERE status = 'Pending' AND order_id IN (");
    let mut ids = builder.separated(", ");
    for id in order_ids {
        ids.push_bind(*id);
    }
    builder.push(")");
    let result = builder.build().execute(conn).await?;
    Ok(result.rows_affected())
}

/// Delete the payments attached to this product's orders. Part of the product-delete transaction.
pub(crate) async fn delete_payments_for_product(product_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM payments WHERE order_id IN (SELECT id FROM orders WHERE product_id = $1)")
            .bind(product_id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn delete_orders_for_product(product_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE product_id = $1").bind(product_id).execute(conn).await?;
    Ok(result.rows_affected())
}
