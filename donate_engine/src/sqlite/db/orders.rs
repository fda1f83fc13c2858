use chrono::{DateTime, Utc};
use dpg_common::Rubles;
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderStatusType, OwnedPrivilege},
    order_objects::{OrderQueryFilter, OrderSummary},
    traits::StorefrontDbError,
};

const DEFAULT_SEARCH_LIMIT: i64 = 200;

pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (buyer_id, product_id, nickname, status, promo_code_input, created_at, updated_at)
            VALUES ($1, $2, $3, 'Pending', $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(order.buyer_id)
    .bind(order.product_id)
    .bind(order.nickname)
    .bind(order.promo_code_input)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`, newest first. The free-text query
/// matches nickname, buyer e-mail and product name.
pub async fn search_orders(
    filter: &OrderQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT orders.* FROM orders
    JOIN buyers ON orders.buyer_id = buyers.id
    JOIN products ON orders.product_id = products.id
    "#,
    );
    if !(filter.status.is_none() && filter.query.is_none() && filter.since.is_none() && filter.until.is_none()) {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(status) = filter.status {
        where_clause.push("orders.status = ");
        where_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(query) = &filter.query {
        let pattern = format!("%{}%", query.trim());
        where_clause.push("(orders.nickname LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR buyers.email LIKE ");
        where_clause.push_bind_unseparated(pattern.clone());
        where_clause.push_unseparated(" OR products.name LIKE ");
        where_clause.push_bind_unseparated(pattern);
        where_clause.push_unseparated(")");
    }
    if let Some(since) = filter.since {
        where_clause.push("orders.created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = filter.until {
        where_clause.push("orders.created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY orders.created_at DESC, orders.id DESC LIMIT ");
    builder.push_bind(filter.limit.unwrap_or(DEFAULT_SEARCH_LIMIT));
    builder.push(" OFFSET ");
    builder.push_bind(filter.offset.unwrap_or(0));

    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {} row(s)", orders.len());
    Ok(orders)
}

pub(crate) async fn update_order_status(
    id: i64,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontDbError> {
    let result: Option<Order> =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
            .bind(status.to_string())
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(StorefrontDbError::OrderNotFound(id))
}

/// The pending orders created before `cutoff`. The expiry sweep cancels these.
pub(crate) async fn pending_orders_older_than(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE status = 'Pending' AND created_at < $1")
        .bind(cutoff)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// The privilege products this nickname holds completed orders for. Nickname matching is case-insensitive.
pub async fn completed_privileges_for(
    nickname: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<OwnedPrivilege>, sqlx::Error> {
    let owned = sqlx::query_as(
        r#"
        SELECT DISTINCT
            products.id as product_id,
            products.name as name,
            products.price as price,
            products.privilege_rank as privilege_rank
        FROM orders JOIN products ON orders.product_id = products.id
        WHERE
            orders.status = 'Completed' AND
            products.category = 'privilege' AND
            orders.nickname = $1 COLLATE NOCASE
        "#,
    )
    .bind(nickname.trim())
    .fetch_all(conn)
    .await?;
    Ok(owned)
}

pub async fn order_summary(conn: &mut SqliteConnection) -> Result<OrderSummary, sqlx::Error> {
    let counts: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status").fetch_all(&mut *conn).await?;
    let mut summary = OrderSummary::default();
    for (status, count) in counts {
        summary.total += count;
        match status.as_str() {
            "Pending" => summary.pending = count,
            "Completed" => summary.completed = count,
            "Failed" => summary.failed = count,
            "Cancelled" => summary.cancelled = count,
            _ => {},
        }
    }
    let revenue: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(payments.amount), 0)
        FROM payments JOIN orders ON payments.order_id = orders.id
        WHERE orders.status = 'Completed'
        "#,
    )
    .fetch_one(conn)
    .await?;
    summary.revenue = Rubles::new(revenue);
    Ok(summary)
}
