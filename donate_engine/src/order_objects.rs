//! Query and presentation shapes for orders.

use chrono::{DateTime, Utc};
use dpg_common::Rubles;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType, Payment, Product};

/// The admin order-list filter. Every field is optional; the filters AND together.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQueryFilter {
    pub status: Option<OrderStatusType>,
    /// Case-insensitive substring match against nickname, buyer e-mail or product name.
    pub query: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_status(status: OrderStatusType) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.query.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.offset.is_none()
            && self.limit.is_none()
    }
}

/// An order joined to its product, payment and buyer e-mail. The shape the admin surface reads and the CSV
/// export serializes.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithRelations {
    pub order: Order,
    pub product: Product,
    pub payment: Option<Payment>,
    pub buyer_email: String,
}

impl OrderWithRelations {
    /// The authoritative amount for display: the payment amount when a payment exists, else the list price.
    pub fn amount(&self) -> Rubles {
        self.payment.as_ref().map(|p| p.amount).unwrap_or(self.product.price)
    }
}

/// Aggregate counters for the admin dashboard header.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OrderSummary {
    pub total: i64,
    pub pending: i64,
    pub completed: i64,
    pub failed: i64,
    pub cancelled: i64,
    /// Sum of payment amounts over completed orders.
    pub revenue: Rubles,
}
