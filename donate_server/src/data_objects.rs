use std::fmt::Display;

use donate_engine::{
    db_types::OrderStatusType,
    order_objects::{OrderSummary, OrderWithRelations},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub email: String,
    pub nickname: String,
    pub product_id: i64,
    #[serde(default)]
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// The EasyDonate payment page the buyer must be redirected to.
    pub payment_url: String,
    /// The amount the buyer will be charged, in whole rubles.
    pub payable_amount: i64,
    /// `list price - payable`, floored at zero.
    pub discount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminOrdersQuery {
    #[serde(default)]
    pub status: Option<OrderStatusType>,
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderWithRelations>,
    pub summary: OrderSummary,
}
