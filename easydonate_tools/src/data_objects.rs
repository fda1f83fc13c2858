use dpg_common::Rubles;
use serde::{Deserialize, Serialize};
use serde_json::Value;

//--------------------------------------  Raw response envelope  ------------------------------------------------------
/// Every EasyDonate endpoint wraps its payload in the same envelope. `response` is kept loose because failure
/// responses put a human-readable string where the payload normally goes.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub response_message: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

impl ApiEnvelope {
    /// The best available human-readable failure message for this envelope.
    pub fn failure_message(&self, fallback: &str) -> String {
        match &self.response {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => self.response_message.clone().unwrap_or_else(|| fallback.to_string()),
        }
    }
}

//--------------------------------------     RemoteProduct     --------------------------------------------------------
/// A product as EasyDonate describes it. Prices arrive as numbers or strings depending on the shop configuration,
/// so everything is normalised to whole rubles on ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct RemoteProduct {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Rubles,
    pub product_type: String,
    pub commands: Vec<String>,
    pub image: Option<String>,
    pub sort_index: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RemoteProductPayload {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub commands: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub sort_index: Option<i64>,
}

/// Coerce a price field that may be a number or a numeric string into whole rubles, defaulting to zero.
pub(crate) fn coerce_price(value: Option<&Value>) -> Rubles {
    match value {
        Some(Value::Number(n)) => n.as_f64().map(Rubles::from_rounded).unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Rubles::from_rounded).unwrap_or_default(),
        _ => Rubles::default(),
    }
}

impl From<RemoteProductPayload> for RemoteProduct {
    fn from(payload: RemoteProductPayload) -> Self {
        let commands = payload
            .commands
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            id: payload.id.to_string(),
            name: payload.name.map(|n| n.trim().to_string()).unwrap_or_default(),
            description: payload.description.map(|d| d.trim().to_string()).unwrap_or_default(),
            price: coerce_price(payload.price.as_ref()),
            product_type: payload.product_type.unwrap_or_else(|| "unknown".to_string()),
            commands,
            image: payload.image,
            sort_index: payload.sort_index,
        }
    }
}

//--------------------------------------   CreatePaymentRequest   -----------------------------------------------------
/// Everything the payment-session creation call needs. The product id here may be a surcharge substitute rather
/// than the product the buyer clicked on.
#[derive(Debug, Clone)]
pub struct CreatePaymentRequest {
    pub customer: String,
    pub server_id: i64,
    pub product_id: String,
    pub email: String,
    pub coupon: Option<String>,
    pub success_url: Option<String>,
}

//--------------------------------------     PaymentSession     -------------------------------------------------------
/// A successfully created payment session. `cost` is the amount the provider will actually charge; when present it
/// overrides any locally computed estimate.
#[derive(Debug, Clone)]
pub struct PaymentSession {
    pub url: String,
    pub payment_id: String,
    pub cost: Option<Rubles>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaymentSessionPayload {
    pub url: Option<String>,
    pub payment: Option<PaymentRecordPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PaymentRecordPayload {
    pub id: Option<Value>,
    #[serde(default)]
    pub cost: Option<f64>,
}

//--------------------------------------     SurchargeQuote     -------------------------------------------------------
/// A stacking discount reported by the EasyDonate.Surcharge plugin. `discount_product_id`, when present, is a
/// substitute product that already carries the discounted price and should be charged instead of the original.
#[derive(Debug, Clone)]
pub struct SurchargeQuote {
    pub amount: Rubles,
    pub discount_product_id: Option<String>,
    pub target_product_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SurchargePayload {
    #[serde(default)]
    pub discount: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub target: Option<SurchargeTargetPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SurchargeTargetPayload {
    #[serde(default)]
    pub id: Option<Value>,
}

/// Provider ids show up as numbers or strings depending on the endpoint. Normalise to a string key.
pub(crate) fn coerce_id(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}
