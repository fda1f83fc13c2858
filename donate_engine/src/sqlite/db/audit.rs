use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{AuditEntry, NewAuditEntry};

pub async fn insert_entry(entry: NewAuditEntry, conn: &mut SqliteConnection) -> Result<AuditEntry, sqlx::Error> {
    let metadata = entry.metadata.map(|m| m.to_string());
    let entry = sqlx::query_as(
        r#"
            INSERT INTO audit_log (buyer_id, action, entity, entity_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(entry.buyer_id)
    .bind(entry.action)
    .bind(entry.entity)
    .bind(entry.entity_id)
    .bind(metadata)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn recent_entries(limit: i64, conn: &mut SqliteConnection) -> Result<Vec<AuditEntry>, sqlx::Error> {
    let entries = sqlx::query_as("SELECT * FROM audit_log ORDER BY created_at DESC, id DESC LIMIT $1")
        .bind(limit)
        .fetch_all(conn)
        .await?;
    Ok(entries)
}

pub async fn delete_entry(id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM audit_log WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}
