use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use dpg_common::{Rubles, RUB_CURRENCY_CODE};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub const PAYMENT_PROVIDER: &str = "EASYDONATE";

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {0}: {1}")]
pub struct ConversionError(&'static str, String);

//--------------------------------------        Role        ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Role {
    /// An ordinary storefront customer, created lazily at checkout. Not a login path.
    Buyer,
    /// A back-office administrator.
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Buyer => write!(f, "Buyer"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

//--------------------------------------   ProductCategory   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Privilege,
    Case,
    Booster,
    Cosmetic,
}

impl Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductCategory::Privilege => write!(f, "privilege"),
            ProductCategory::Case => write!(f, "case"),
            ProductCategory::Booster => write!(f, "booster"),
            ProductCategory::Cosmetic => write!(f, "cosmetic"),
        }
    }
}

impl FromStr for ProductCategory {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "privilege" => Ok(Self::Privilege),
            "case" => Ok(Self::Case),
            "booster" => Ok(Self::Booster),
            "cosmetic" => Ok(Self::Cosmetic),
            other => Err(ConversionError("product category", other.to_string())),
        }
    }
}

//--------------------------------------    ProductStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ProductStatus {
    /// Visible in the public catalog and purchasable.
    Active,
    /// Hidden from the public catalog but kept for admin view.
    Hidden,
    /// Retired. Never listed or sold.
    Archived,
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductStatus::Active => write!(f, "Active"),
            ProductStatus::Hidden => write!(f, "Hidden"),
            ProductStatus::Archived => write!(f, "Archived"),
        }
    }
}

impl FromStr for ProductStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(Self::Active),
            "Hidden" => Ok(Self::Hidden),
            "Archived" => Ok(Self::Archived),
            other => Err(ConversionError("product status", other.to_string())),
        }
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created and a payment session exists, but the provider has not confirmed payment.
    Pending,
    /// The provider confirmed payment in full.
    Completed,
    /// The payment failed on the provider side.
    Failed,
    /// Cancelled by an admin, or automatically after the expiry window.
    Cancelled,
}

impl OrderStatusType {
    /// Terminal statuses are never resurrected by the core pipeline.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatusType::Pending)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Failed => write!(f, "Failed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Cancelled" => Ok(Self::Cancelled),
            other => Err(ConversionError("order status", other.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  PaymentStatusType  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    Pending,
    Received,
    Cancelled,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Received => write!(f, "Received"),
            PaymentStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

//--------------------------------------        Buyer        ---------------------------------------------------------
/// An identity keyed by e-mail. Created lazily on first purchase; distinct from the in-game nickname an order is
/// fulfilled to.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Buyer {
    pub id: i64,
    pub email: String,
    pub role: Role,
    /// An opaque random credential assigned at creation. Guest checkout never uses it; it only exists so the row
    /// shape matches accounts created through the admin surface.
    #[serde(skip)]
    pub credential: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    pub price: Rubles,
    pub highlight: Option<String>,
    pub commands: Option<String>,
    pub region_limit: Option<i64>,
    /// Total order over privilege tiers. Only meaningful for `category == Privilege`; `None` excludes the product
    /// from tier comparisons entirely.
    pub privilege_rank: Option<i64>,
    pub status: ProductStatus,
    /// The provider-side product id. Both provider ids must be resolvable for the product to be payable online.
    pub easydonate_product_id: Option<String>,
    pub easydonate_server_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ProductCategory,
    pub price: Rubles,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub commands: Option<String>,
    #[serde(default)]
    pub region_limit: Option<i64>,
    #[serde(default)]
    pub privilege_rank: Option<i64>,
    #[serde(default)]
    pub easydonate_product_id: Option<String>,
    #[serde(default)]
    pub easydonate_server_id: Option<i64>,
}

/// A partial product update. Only the supplied fields are written.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub price: Option<Rubles>,
    pub highlight: Option<Option<String>>,
    pub commands: Option<Option<String>>,
    pub region_limit: Option<Option<i64>>,
    pub privilege_rank: Option<Option<i64>>,
    pub status: Option<ProductStatus>,
    pub easydonate_product_id: Option<Option<String>>,
    pub easydonate_server_id: Option<Option<i64>>,
}

impl UpdateProductRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.price.is_none()
            && self.highlight.is_none()
            && self.commands.is_none()
            && self.region_limit.is_none()
            && self.privilege_rank.is_none()
            && self.status.is_none()
            && self.easydonate_product_id.is_none()
            && self.easydonate_server_id.is_none()
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub buyer_id: i64,
    pub product_id: i64,
    /// The in-game character name the purchase is fulfilled to. Not the buyer identity.
    pub nickname: String,
    pub status: OrderStatusType,
    pub promo_code_input: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub buyer_id: i64,
    pub product_id: i64,
    pub nickname: String,
    pub promo_code_input: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(buyer_id: i64, product_id: i64, nickname: String) -> Self {
        Self { buyer_id, product_id, nickname, promo_code_input: None, created_at: Utc::now() }
    }

    pub fn with_promo_code(mut self, code: String) -> Self {
        self.promo_code_input = Some(code);
        self
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
/// The financial leg of an order, one-to-one. `amount` is the authoritative figure: the gateway-reported cost when
/// one was given, else the locally computed payable.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub provider: String,
    pub amount: Rubles,
    pub currency: String,
    pub status: PaymentStatusType,
    /// The provider-side payment id. Unique across all payments; the idempotency key for webhook reconciliation.
    pub external_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub amount: Rubles,
    pub currency: String,
    pub external_id: String,
}

impl NewPayment {
    pub fn new(amount: Rubles, external_id: String) -> Self {
        Self { amount, currency: RUB_CURRENCY_CODE.to_string(), external_id }
    }
}

/// A payment joined to its order and the buyer's e-mail; the record the webhook reconciler works with.
#[derive(Debug, Clone)]
pub struct PaymentWithOrder {
    pub payment: Payment,
    pub order: Order,
    pub buyer_email: String,
}

//--------------------------------------        Coupon       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Coupon {
    pub id: i64,
    /// Upper-cased, unique.
    pub code: String,
    pub discount_percent: i64,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    /// When set, only this (lower-cased) e-mail may redeem the coupon.
    pub issued_for_email: Option<String>,
    pub issued_for_buyer_id: Option<i64>,
    /// Set on thank-you coupons; unique when present, which caps issuance at one per order.
    pub issued_for_order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub discount_percent: i64,
    pub expires_at: DateTime<Utc>,
    pub issued_for_email: Option<String>,
    pub issued_for_buyer_id: Option<i64>,
    pub issued_for_order_id: Option<i64>,
}

//--------------------------------------      AuditEntry     ---------------------------------------------------------
/// One immutable record of an administrative or system action. The core pipeline only ever appends.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub buyer_id: Option<i64>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub buyer_id: Option<i64>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn new<A: Into<String>, E: Into<String>>(action: A, entity: E) -> Self {
        Self { buyer_id: None, action: action.into(), entity: entity.into(), entity_id: None, metadata: None }
    }

    pub fn for_entity_id<I: ToString>(mut self, id: I) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn by_buyer(mut self, buyer_id: i64) -> Self {
        self.buyer_id = Some(buyer_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

//--------------------------------------    OwnedPrivilege   ---------------------------------------------------------
/// A privilege product a nickname has already completed an order for. Input to the tier guard.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedPrivilege {
    pub product_id: i64,
    pub name: String,
    pub price: Rubles,
    pub privilege_rank: Option<i64>,
}
