use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Coupon, NewCoupon},
    traits::StorefrontDbError,
};

/// Look a coupon up by its code. The `code` column carries `COLLATE NOCASE`, so the match is case-insensitive.
pub async fn fetch_coupon_by_code(code: &str, conn: &mut SqliteConnection) -> Result<Option<Coupon>, sqlx::Error> {
    let coupon =
        sqlx::query_as("SELECT * FROM coupons WHERE code = $1").bind(code.trim()).fetch_optional(conn).await?;
    Ok(coupon)
}

pub async fn insert_coupon(coupon: NewCoupon, conn: &mut SqliteConnection) -> Result<Coupon, StorefrontDbError> {
    let code = coupon.code.trim().to_uppercase();
    let result = sqlx::query_as(
        r#"
            INSERT INTO coupons (
                code,
                discount_percent,
                expires_at,
                used,
                issued_for_email,
                issued_for_buyer_id,
                issued_for_order_id,
                created_at
            ) VALUES ($1, $2, $3, 0, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(&code)
    .bind(coupon.discount_percent.clamp(0, 100))
    .bind(coupon.expires_at)
    .bind(coupon.issued_for_email.map(|e| e.trim().to_lowercase()))
    .bind(coupon.issued_for_buyer_id)
    .bind(coupon.issued_for_order_id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(coupon) => Ok(coupon),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StorefrontDbError::CouponAlreadyExists(code)),
        Err(e) => Err(e.into()),
    }
}

/// Mark the coupon used. Returns false if it was already used (or does not exist).
pub async fn redeem_coupon(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE coupons SET used = 1, used_at = $1 WHERE id = $2 AND used = 0")
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn thank_you_coupon_exists(order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let exists: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM coupons WHERE issued_for_order_id = $1)")
        .bind(order_id)
        .fetch_one(conn)
        .await?;
    Ok(exists != 0)
}
