use std::fmt::Debug;

use chrono::{Duration, Utc};
use dpg_common::Rubles;
use log::*;
use rand::Rng;
use serde_json::json;

use crate::{
    api::errors::{CouponRejection, OrderFlowError},
    db_types::{
        Buyer,
        Coupon,
        NewAuditEntry,
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
    },
    order_objects::{OrderQueryFilter, OrderSummary, OrderWithRelations},
    traits::{AuditLogging, OrderManagement, StorefrontDatabase, StorefrontDbError},
};

pub const THANK_YOU_PREFIX: &str = "BLOCKERA-";
pub const THANK_YOU_PERCENT: i64 = 10;
pub const THANK_YOU_VALIDITY_DAYS: i64 = 7;

/// Everything checkout persisted: the (possibly fresh) buyer, the pending order and its payment leg.
#[derive(Debug, Clone)]
pub struct CheckoutRecord {
    pub buyer: Buyer,
    pub order: Order,
    pub payment: Payment,
}

/// The discount figures checkout settled on. Recorded in the `ORDER_CREATE` audit entry so a disputed
/// charge can be reconstructed without replaying the pricing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckoutDiscounts {
    /// The trade-in credit the buyer qualified for, before clamping to the list price.
    pub requested_surcharge: Rubles,
    /// The trade-in credit actually applied.
    pub applied_surcharge: Rubles,
    /// The coupon discount on the surcharge-adjusted subtotal.
    pub coupon_discount: Rubles,
    /// The locally computed payable estimate. The persisted payment amount may differ when the provider
    /// reports its own cost.
    pub payable_estimate: Rubles,
}

/// The result of reconciling a provider payment notification.
#[derive(Debug, Clone)]
pub enum FinalizeOutcome {
    /// No payment with that provider id exists. Acknowledged so the provider stops retrying.
    UnknownPayment,
    /// The payment had already left `Pending`. A repeat delivery; nothing was written.
    AlreadySettled(PaymentWithOrder),
    /// The payment was settled now. Carries the thank-you coupon if one was issued on this delivery.
    Completed { record: PaymentWithOrder, thank_you: Option<Coupon> },
}

/// `OrderFlowApi` is the primary API for the order pipeline: checkout persistence, payment reconciliation and
/// the expiry sweep, each with its audit-trail writes.
pub struct OrderFlowApi<B> {
    db: B,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase + AuditLogging
{
    /// Fetch the product for a checkout attempt. Missing, hidden and archived products all collapse into
    /// [`OrderFlowError::ProductNotAvailable`]; the buyer is not told which.
    pub async fn fetch_active_product(&self, product_id: i64) -> Result<Product, OrderFlowError> {
        let product = self.db.fetch_product(product_id).await?;
        match product {
            Some(p) if p.is_active() => Ok(p),
            Some(p) => {
                debug!("🛒️ Product #{product_id} ({}) is {} and cannot be bought", p.name, p.status);
                Err(OrderFlowError::ProductNotAvailable(product_id))
            },
            None => Err(OrderFlowError::ProductNotAvailable(product_id)),
        }
    }

    /// The privilege products this nickname has already completed orders for.
    pub async fn completed_privileges(&self, nickname: &str) -> Result<Vec<OwnedPrivilege>, OrderFlowError> {
        Ok(self.db.completed_privileges_for(nickname).await?)
    }

    /// Validate a promo code for this buyer. Returns the coupon if it exists, is unused, unexpired, and is
    /// either unrestricted or issued to this e-mail address.
    pub async fn resolve_coupon(&self, code: &str, email: &str) -> Result<Coupon, OrderFlowError> {
        let coupon = self.db.fetch_coupon(code).await?.ok_or(CouponRejection::UnknownCode)?;
        if coupon.used {
            return Err(CouponRejection::AlreadyUsed.into());
        }
        if coupon.expires_at <= Utc::now() {
            return Err(CouponRejection::Expired.into());
        }
        if let Some(issued_for) = &coupon.issued_for_email {
            if !issued_for.eq_ignore_ascii_case(email) {
                return Err(CouponRejection::NotIssuedToYou.into());
            }
        }
        Ok(coupon)
    }

    /// Persist a checkout in one transaction: find or create the buyer, then insert the pending order and its
    /// payment leg. Writes one `ORDER_CREATE` audit entry carrying the discount breakdown.
    pub async fn record_checkout(
        &self,
        email: &str,
        credential: &str,
        product_id: i64,
        nickname: &str,
        promo_code: Option<String>,
        payment: NewPayment,
        discounts: CheckoutDiscounts,
    ) -> Result<CheckoutRecord, OrderFlowError> {
        let buyer = self.db.fetch_or_create_buyer(email, credential).await?;
        let mut order = NewOrder::new(buyer.id, product_id, nickname.to_string());
        if let Some(code) = promo_code {
            order = order.with_promo_code(code);
        }
        let external_id = payment.external_id.clone();
        let amount = payment.amount;
        let (order, payment) = self.db.insert_order_with_payment(order, payment).await?;
        let entry = NewAuditEntry::new("ORDER_CREATE", "order")
            .for_entity_id(order.id)
            .by_buyer(buyer.id)
            .with_metadata(json!({
                "product_id": product_id,
                "nickname": nickname,
                "amount": amount.value(),
                "payment_id": external_id,
                "payable_estimate": discounts.payable_estimate.value(),
                "surcharge_discount": discounts.applied_surcharge.value(),
                "requested_surcharge_discount": discounts.requested_surcharge.value(),
                "coupon_discount": discounts.coupon_discount.value(),
            }));
        self.db.insert_audit_entry(entry).await?;
        debug!("🛒️ Order #{} for {nickname} recorded against payment [{external_id}]", order.id);
        Ok(CheckoutRecord { buyer, order, payment })
    }

    pub async fn payment_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentWithOrder>, OrderFlowError> {
        Ok(self.db.fetch_payment_by_external_id(external_id).await?)
    }

    /// Settle the payment with the given provider id at the given authoritative amount.
    ///
    /// Idempotent: an unknown id and a payment that already left `Pending` are both acknowledged without
    /// writing anything. On first settlement, one `PAYMENT_RECEIVED` audit entry is written, the order's promo
    /// code (if any) is marked used, and a thank-you coupon is issued unless the order already has one.
    pub async fn finalize_payment(&self, external_id: &str, cost: Rubles) -> Result<FinalizeOutcome, OrderFlowError> {
        let Some(record) = self.db.fetch_payment_by_external_id(external_id).await? else {
            info!("📬️ Ignoring notification for unknown payment [{external_id}]");
            return Ok(FinalizeOutcome::UnknownPayment);
        };
        if record.payment.status != PaymentStatusType::Pending {
            debug!("📬️ Payment [{external_id}] is already {}. Repeat delivery ignored", record.payment.status);
            return Ok(FinalizeOutcome::AlreadySettled(record));
        }
        let record = self.db.mark_payment_received(record.payment.id, cost).await?;
        let entry = NewAuditEntry::new("PAYMENT_RECEIVED", "payment")
            .for_entity_id(external_id)
            .by_buyer(record.order.buyer_id)
            .with_metadata(json!({ "order_id": record.order.id, "amount": cost.value() }));
        self.db.insert_audit_entry(entry).await?;
        info!("📬️ Payment [{external_id}] received. Order #{} is complete", record.order.id);
        self.redeem_order_promo_code(&record.order).await;
        let thank_you = self.issue_thank_you_coupon(&record).await?;
        Ok(FinalizeOutcome::Completed { record, thank_you })
    }

    /// Mark the promo code the order was placed with as used. Failures are logged and swallowed; a coupon
    /// bookkeeping hiccup must never fail a settlement.
    async fn redeem_order_promo_code(&self, order: &Order) {
        let Some(code) = &order.promo_code_input else {
            return;
        };
        match self.db.fetch_coupon(code).await {
            Ok(Some(coupon)) if !coupon.used => match self.db.redeem_coupon(coupon.id).await {
                Ok(true) => debug!("📬️ Promo code {} redeemed for order #{}", coupon.code, order.id),
                Ok(false) => debug!("📬️ Promo code {} was already redeemed", coupon.code),
                Err(e) => warn!("📬️ Could not redeem promo code {}: {e}", coupon.code),
            },
            Ok(_) => {},
            Err(e) => warn!("📬️ Could not look up promo code for order #{}: {e}", order.id),
        }
    }

    /// Issue the post-purchase thank-you coupon, at most once per order. A code collision is retried with a
    /// fresh code; a concurrent issuer winning the unique order-id slot is treated as "already issued".
    async fn issue_thank_you_coupon(&self, record: &PaymentWithOrder) -> Result<Option<Coupon>, OrderFlowError> {
        if self.db.thank_you_coupon_exists(record.order.id).await? {
            return Ok(None);
        }
        let expires_at = Utc::now() + Duration::days(THANK_YOU_VALIDITY_DAYS);
        for _ in 0..3 {
            let coupon = NewCoupon {
                code: generate_thank_you_code(),
                discount_percent: THANK_YOU_PERCENT,
                expires_at,
                issued_for_email: Some(record.buyer_email.clone()),
                issued_for_buyer_id: Some(record.order.buyer_id),
                issued_for_order_id: Some(record.order.id),
            };
            match self.db.insert_coupon(coupon).await {
                Ok(coupon) => {
                    let entry = NewAuditEntry::new("COUPON_ISSUED", "coupon")
                        .for_entity_id(coupon.id)
                        .by_buyer(record.order.buyer_id)
                        .with_metadata(json!({ "code": coupon.code, "order_id": record.order.id }));
                    self.db.insert_audit_entry(entry).await?;
                    info!("📬️ Thank-you coupon {} issued for order #{}", coupon.code, record.order.id);
                    return Ok(Some(coupon));
                },
                Err(StorefrontDbError::CouponAlreadyExists(code)) => {
                    debug!("📬️ Coupon code collision on {code}. Retrying with a fresh code");
                },
                Err(e) => return Err(e.into()),
            }
        }
        warn!("📬️ Gave up issuing a thank-you coupon for order #{} after repeated collisions", record.order.id);
        Ok(None)
    }

    /// Cancel every pending order older than `window`, along with its payment, writing one
    /// `ORDER_AUTO_CANCELLED` audit entry per order. A non-positive window disables the sweep.
    pub async fn cancel_expired_orders(&self, window: Duration) -> Result<Vec<Order>, OrderFlowError> {
        if window <= Duration::zero() {
            return Ok(Vec::new());
        }
        let cutoff = Utc::now() - window;
        let cancelled = self.db.cancel_orders_older_than(cutoff).await?;
        for order in &cancelled {
            let entry = NewAuditEntry::new("ORDER_AUTO_CANCELLED", "order")
                .for_entity_id(order.id)
                .with_metadata(json!({ "reason": "expired", "auto": true }));
            self.db.insert_audit_entry(entry).await?;
        }
        if !cancelled.is_empty() {
            info!("🕰️ Auto-cancelled {} pending order(s) older than {window}", cancelled.len());
        }
        Ok(cancelled)
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + AuditLogging
{
    pub async fn order_with_relations(&self, order_id: i64) -> Result<Option<OrderWithRelations>, OrderFlowError> {
        Ok(self.db.fetch_order_with_relations(order_id).await?)
    }

    pub async fn search_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<OrderWithRelations>, OrderFlowError> {
        Ok(self.db.search_orders(filter).await?)
    }

    pub async fn order_summary(&self) -> Result<OrderSummary, OrderFlowError> {
        Ok(self.db.order_summary().await?)
    }

    /// Admin status override. Writes an `ORDER_UPDATE` audit entry recording the transition.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatusType,
    ) -> Result<OrderWithRelations, OrderFlowError> {
        let before = self
            .db
            .fetch_order_with_relations(order_id)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let updated = self.db.set_order_status(order_id, status).await?;
        let entry = NewAuditEntry::new("ORDER_UPDATE", "order")
            .for_entity_id(order_id)
            .with_metadata(json!({ "from": before.order.status.to_string(), "to": status.to_string() }));
        self.db.insert_audit_entry(entry).await?;
        info!("🗃️ Order #{order_id} status changed: {} -> {status}", before.order.status);
        Ok(updated)
    }
}

fn generate_thank_you_code() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8).map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char).collect();
    format!("{THANK_YOU_PREFIX}{suffix}")
}
