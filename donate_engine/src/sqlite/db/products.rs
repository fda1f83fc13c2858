use chrono::Utc;
use log::trace;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewProduct, Product, UpdateProductRequest},
    traits::StorefrontDbError,
};

pub async fn fetch_product_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

/// Every product, for the admin view. Cheapest first, then insertion order.
pub async fn all_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products ORDER BY price ASC, id ASC").fetch_all(conn).await?;
    Ok(products)
}

/// The public catalog: active products only, cheapest first.
pub async fn listed_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products WHERE status = 'Active' ORDER BY price ASC, id ASC")
        .fetch_all(conn)
        .await?;
    Ok(products)
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, StorefrontDbError> {
    let now = Utc::now();
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (
                name,
                description,
                category,
                price,
                highlight,
                commands,
                region_limit,
                privilege_rank,
                status,
                easydonate_product_id,
                easydonate_server_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'Active', $9, $10, $11, $11)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.description)
    .bind(product.category)
    .bind(product.price)
    .bind(product.highlight)
    .bind(product.commands)
    .bind(product.region_limit)
    .bind(product.privilege_rank)
    .bind(product.easydonate_product_id)
    .bind(product.easydonate_server_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

/// Apply a partial update. Double-`Option` fields distinguish "leave alone" from "set to NULL".
pub async fn update_product(
    id: i64,
    update: UpdateProductRequest,
    conn: &mut SqliteConnection,
) -> Result<Product, StorefrontDbError> {
    if update.is_empty() {
        return fetch_product_by_id(id, conn).await?.ok_or(StorefrontDbError::ProductNotFound(id));
    }
    let mut builder = QueryBuilder::new("UPDATE products SET ");
    let mut set_clause = builder.separated(", ");
    set_clause.push("updated_at = ");
    set_clause.push_bind_unseparated(Utc::now());
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(category) = update.category {
        set_clause.push("category = ");
        set_clause.push_bind_unseparated(category);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(highlight) = update.highlight {
        set_clause.push("highlight = ");
        set_clause.push_bind_unseparated(highlight);
    }
    if let Some(commands) = update.commands {
        set_clause.push("commands = ");
        set_clause.push_bind_unseparated(commands);
    }
    if let Some(region_limit) = update.region_limit {
        set_clause.push("region_limit = ");
        set_clause.push_bind_unseparated(region_limit);
    }
    if let Some(privilege_rank) = update.privilege_rank {
        set_clause.push("privilege_rank = ");
        set_clause.push_bind_unseparated(privilege_rank);
    }
    if let Some(status) = update.status {
        set_clause.push("status = ");
        set_clause.push_bind_unseparated(status);
    }
    if let Some(ed_product_id) = update.easydonate_product_id {
        set_clause.push("easydonate_product_id = ");
        set_clause.push_bind_unseparated(ed_product_id);
    }
    if let Some(ed_server_id) = update.easydonate_server_id {
        set_clause.push("easydonate_server_id = ");
        set_clause.push_bind_unseparated(ed_server_id);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let product =
        builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| Product::from_row(&row)).transpose()?;
    product.ok_or(StorefrontDbError::ProductNotFound(id))
}

/// Delete the product row. The caller removes dependent orders and payments first, inside the same transaction.
pub async fn delete_product_row(id: i64, conn: &mut SqliteConnection) -> Result<Product, StorefrontDbError> {
    let product: Option<Product> =
        sqlx::query_as("DELETE FROM products WHERE id = $1 RETURNING *").bind(id).fetch_optional(conn).await?;
    product.ok_or(StorefrontDbError::ProductNotFound(id))
}
