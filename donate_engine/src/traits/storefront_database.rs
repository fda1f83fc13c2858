use chrono::{DateTime, Utc};
use dpg_common::Rubles;
use thiserror::Error;

use crate::db_types::{
    Buyer,
    Coupon,
    NewCoupon,
    NewOrder,
    NewPayment,
    Order,
    OwnedPrivilege,
    Payment,
    PaymentWithOrder,
    Product,
};

/// The core pipeline behaviour a storefront backend must expose: everything checkout, webhook reconciliation and
/// the expiry sweep need. Admin queries live on the narrower traits in this module.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StorefrontDbError>;

    /// Fetch the buyer with the given e-mail, creating one with the supplied throwaway credential if none
    /// exists. The e-mail is matched and stored lower-cased.
    async fn fetch_or_create_buyer(&self, email: &str, credential: &str) -> Result<Buyer, StorefrontDbError>;

    /// The privilege products this nickname has already completed orders for. Input to the tier guard.
    async fn completed_privileges_for(&self, nickname: &str) -> Result<Vec<OwnedPrivilege>, StorefrontDbError>;

    /// Look a coupon up by its code, case-insensitively.
    async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, StorefrontDbError>;

    /// Store the order and its payment leg in a single atomic transaction.
    ///
    /// Fails with [`StorefrontDbError::PaymentAlreadyExists`] if the provider payment id has been seen before.
    async fn insert_order_with_payment(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, Payment), StorefrontDbError>;

    /// Fetch a payment by its provider-side id, joined to its order and the buyer e-mail.
    async fn fetch_payment_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<PaymentWithOrder>, StorefrontDbError>;

    /// In a single atomic transaction, mark the payment `Received` with the given authoritative amount and its
    /// order `Completed`. Returns the updated records.
    ///
    /// Fails with [`StorefrontDbError::IllegalStatusChange`] if the payment is not `Pending`.
    async fn mark_payment_received(
        &self,
        payment_id: i64,
        amount: Rubles,
    ) -> Result<PaymentWithOrder, StorefrontDbError>;

    /// Mark the coupon used, stamping `used_at`. Returns false if it was already used.
    async fn redeem_coupon(&self, coupon_id: i64) -> Result<bool, StorefrontDbError>;

    /// Whether a thank-you coupon has already been issued for this order.
    async fn thank_you_coupon_exists(&self, order_id: i64) -> Result<bool, StorefrontDbError>;

    async fn insert_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StorefrontDbError>;

    /// In a single atomic transaction, cancel every pending order created before `cutoff` along with its
    /// payment. Returns the orders that were cancelled.
    async fn cancel_orders_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, StorefrontDbError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontDbError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorefrontDbError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested payment does not exist for provider id {0}")]
    PaymentNotFound(String),
    #[error("Cannot insert payment, since it already exists with provider id {0}")]
    PaymentAlreadyExists(String),
    #[error("Cannot insert coupon, since code {0} already exists")]
    CouponAlreadyExists(String),
    #[error("Illegal status change. {0}")]
    IllegalStatusChange(String),
}

impl From<sqlx::Error> for StorefrontDbError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontDbError::DatabaseError(e.to_string())
    }
}
