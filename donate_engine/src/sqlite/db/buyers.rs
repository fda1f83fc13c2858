use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{db_types::Buyer, traits::StorefrontDbError};

pub async fn fetch_buyer_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<Buyer>, sqlx::Error> {
    let buyer = sqlx::query_as("SELECT * FROM buyers WHERE email = $1")
        .bind(email.trim().to_lowercase())
        .fetch_optional(conn)
        .await?;
    Ok(buyer)
}

/// Fetch the buyer for this e-mail, creating one with the given credential if none exists. The e-mail is stored
/// lower-cased, so lookups are effectively case-insensitive.
pub async fn fetch_or_create_buyer(
    email: &str,
    credential: &str,
    conn: &mut SqliteConnection,
) -> Result<Buyer, StorefrontDbError> {
    if let Some(buyer) = fetch_buyer_by_email(email, conn).await? {
        return Ok(buyer);
    }
    let email = email.trim().to_lowercase();
    let buyer: Buyer = sqlx::query_as(
        r#"
            INSERT INTO buyers (email, role, credential, created_at)
            VALUES ($1, 'Buyer', $2, $3)
            RETURNING *;
        "#,
    )
    .bind(&email)
    .bind(credential)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("📝️ New buyer #{} created for {email}", buyer.id);
    Ok(buyer)
}

pub async fn fetch_buyer_email(buyer_id: i64, conn: &mut SqliteConnection) -> Result<Option<String>, sqlx::Error> {
    let email = sqlx::query_scalar("SELECT email FROM buyers WHERE id = $1").bind(buyer_id).fetch_optional(conn).await?;
    Ok(email)
}
