//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use dpg_common::Rubles;
use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{audit, buyers, coupons, new_pool, orders, payments, products};
use crate::{
    db_types::{
        Buyer,
        Coupon,
        NewAuditEntry,
        AuditEntry,
        NewCoupon,
        NewOrder,
        NewPayment,
        Order,
        OrderStatusType,
        OwnedPrivilege,
        Payment,
        PaymentStatusType,
        PaymentWithOrder,
        Product,
        NewProduct,
        UpdateProductRequest,
    },
    order_objects::{OrderQueryFilter, OrderSummary, OrderWithRelations},
    traits::{AuditLogging, OrderManagement, ProductManagement, StorefrontDatabase, StorefrontDbError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn order_with_relations(
        &self,
        order: Order,
        conn: &mut SqliteConnection,
    ) -> Result<OrderWithRelations, StorefrontDbError> {
        let product = products::fetch_product_by_id(order.product_id, conn)
            .await?
            .ok_or(StorefrontDbError::ProductNotFound(order.product_id))?;
        let payment = payments::fetch_payment_for_order(order.id, conn).await?;
        let buyer_email = buyers::fetch_buyer_email(order.buyer_id, conn).await?.unwrap_or_default();
        Ok(OrderWithRelations { order, product, payment, buyer_email })
    }

    async fn payment_with_order(
        &self,
        payment: Payment,
        conn: &mut SqliteConnection,
    ) -> Result<PaymentWithOrder, StorefrontDbError> {
        let order = orders::fetch_order_by_id(payment.order_id, conn)
            .await?
            .ok_or(StorefrontDbError::OrderNotFound(payment.order_id))?;
        let buyer_email = buyers::fetch_buyer_email(order.buyer_id, conn).await?.unwrap_or_default();
        Ok(PaymentWithOrder { payment, order, buyer_email })
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::fetch_product_by_id(product_id, &mut conn).await?)
    }

    async fn fetch_or_create_buyer(&self, email: &str, credential: &str) -> Result<Buyer, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        buyers::fetch_or_create_buyer(email, credential, &mut conn).await
    }

    async fn completed_privileges_for(&self, nickname: &str) -> Result<Vec<OwnedPrivilege>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::completed_privileges_for(nickname, &mut conn).await?)
    }

    async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::fetch_coupon_by_code(code, &mut conn).await?)
    }

    async fn insert_order_with_payment(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, Payment), StorefrontDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let payment = payments::insert_payment(order.id, payment, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order #{} saved with payment [{}]", order.id, payment.external_id);
        Ok((order, payment))
    }

    async fn fetch_payment_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentWithOrder>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        let Some(payment) = payments::fetch_payment_by_external_id(external_id, &mut conn).await? else {
            return Ok(None);
        };
        self.payment_with_order(payment, &mut conn).await.map(Some)
    }

    async fn mark_payment_received(
        &self,
        payment_id: i64,
        amount: Rubles,
    ) -> Result<PaymentWithOrder, StorefrontDbError> {
        let mut tx = self.pool.begin().await?;
        let payment = payments::fetch_payment_by_id(payment_id, &mut tx)
            .await?
            .ok_or_else(|| StorefrontDbError::PaymentNotFound(payment_id.to_string()))?;
        if payment.status != PaymentStatusType::Pending {
            return Err(StorefrontDbError::IllegalStatusChange(format!(
                "Payment [{}] is {}, not Pending",
                payment.external_id, payment.status
            )));
        }
        let payment =
            payments::update_payment_status(payment_id, PaymentStatusType::Received, Some(amount), &mut tx).await?;
        let order = orders::update_order_status(payment.order_id, OrderStatusType::Completed, &mut tx).await?;
        let buyer_email = buyers::fetch_buyer_email(order.buyer_id, &mut tx).await?.unwrap_or_default();
        tx.commit().await?;
        debug!("🗃️ Payment [{}] settled at {amount}. Order #{} completed", payment.external_id, order.id);
        Ok(PaymentWithOrder { payment, order, buyer_email })
    }

    async fn redeem_coupon(&self, coupon_id: i64) -> Result<bool, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::redeem_coupon(coupon_id, &mut conn).await?)
    }

    async fn thank_you_coupon_exists(&self, order_id: i64) -> Result<bool, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(coupons::thank_you_coupon_exists(order_id, &mut conn).await?)
    }

    async fn insert_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        coupons::insert_coupon(coupon, &mut conn).await
    }

    async fn cancel_orders_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, StorefrontDbError> {
        let mut tx = self.pool.begin().await?;
        let stale = orders::pending_orders_older_than(cutoff, &mut tx).await?;
        if stale.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = stale.iter().map(|o| o.id).collect();
        let cancelled_payments = payments::cancel_pending_payments_for_orders(&ids, &mut tx).await?;
        let mut cancelled = Vec::with_capacity(stale.len());
        for order in stale {
            let order = orders::update_order_status(order.id, OrderStatusType::Cancelled, &mut tx).await?;
            cancelled.push(order);
        }
        tx.commit().await?;
        debug!("🗃️ Expiry sweep cancelled {} order(s) and {cancelled_payments} payment(s)", cancelled.len());
        Ok(cancelled)
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_with_relations(
        &self,
        order_id: i64,
    ) -> Result<Option<OrderWithRelations>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = orders::fetch_order_by_id(order_id, &mut conn).await? else {
            return Ok(None);
        };
        self.order_with_relations(order, &mut conn).await.map(Some)
    }

    async fn search_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<OrderWithRelations>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        let matches = orders::search_orders(filter, &mut conn).await?;
        let mut result = Vec::with_capacity(matches.len());
        for order in matches {
            result.push(self.order_with_relations(order, &mut conn).await?);
        }
        Ok(result)
    }

    async fn order_summary(&self) -> Result<OrderSummary, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::order_summary(&mut conn).await?)
    }

    async fn set_order_status(
        &self,
        order_id: i64,
        status: OrderStatusType,
    ) -> Result<OrderWithRelations, StorefrontDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order_status(order_id, status, &mut tx).await?;
        let payment = match payments::fetch_payment_for_order(order_id, &mut tx).await? {
            Some(payment) => {
                let payment_status = match status {
                    OrderStatusType::Completed => PaymentStatusType::Received,
                    OrderStatusType::Pending => PaymentStatusType::Pending,
                    OrderStatusType::Failed | OrderStatusType::Cancelled => PaymentStatusType::Cancelled,
                };
                let payment = if payment.status == payment_status {
                    payment
                } else {
                    payments::update_payment_status(payment.id, payment_status, None, &mut tx).await?
                };
                Some(payment)
            },
            None => None,
        };
        let product = products::fetch_product_by_id(order.product_id, &mut tx)
            .await?
            .ok_or(StorefrontDbError::ProductNotFound(order.product_id))?;
        let buyer_email = buyers::fetch_buyer_email(order.buyer_id, &mut tx).await?.unwrap_or_default();
        tx.commit().await?;
        Ok(OrderWithRelations { order, product, payment, buyer_email })
    }
}

impl ProductManagement for SqliteDatabase {
    async fn all_products(&self) -> Result<Vec<Product>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::all_products(&mut conn).await?)
    }

    async fn listed_products(&self) -> Result<Vec<Product>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(products::listed_products(&mut conn).await?)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(product, &mut conn).await
    }

    async fn update_product(
        &self,
        product_id: i64,
        update: UpdateProductRequest,
    ) -> Result<Product, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        products::update_product(product_id, update, &mut conn).await
    }

    async fn delete_product(&self, product_id: i64) -> Result<Product, StorefrontDbError> {
        let mut tx = self.pool.begin().await?;
        let removed_payments = payments::delete_payments_for_product(product_id, &mut tx).await?;
        let removed_orders = payments::delete_orders_for_product(product_id, &mut tx).await?;
        let product = products::delete_product_row(product_id, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Product #{product_id} deleted along with {removed_orders} order(s) and {removed_payments} payment(s)"
        );
        Ok(product)
    }
}

impl AuditLogging for SqliteDatabase {
    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::insert_entry(entry, &mut conn).await?)
    }

    async fn fetch_audit_entries(&self, limit: i64) -> Result<Vec<AuditEntry>, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::recent_entries(limit, &mut conn).await?)
    }

    async fn delete_audit_entry(&self, entry_id: i64) -> Result<bool, StorefrontDbError> {
        let mut conn = self.pool.acquire().await?;
        Ok(audit::delete_entry(entry_id, &mut conn).await?)
    }
}
