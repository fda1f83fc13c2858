//! The EasyDonate payment-notification webhook.
//!
//! EasyDonate's delivery format is loose: depending on shop configuration the notification arrives as a JSON
//! object, as a form-encoded body, or as a form-encoded body whose `payload` field holds the JSON. The parser
//! tries each shape in turn and normalises everything to strings, because numeric fields show up as numbers
//! or strings interchangeably.
//!
//! Signature checks cover `"{payment_id}@{cost}@{customer}"` with the shop key as the HMAC secret, using the
//! raw field values exactly as delivered. The endpoint always answers 200 once a notification is accepted,
//! repeat deliveries included, so the provider stops retrying.

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use donate_engine::{traits::StorefrontBackend, FinalizeOutcome, OrderFlowApi};
use dpg_common::Rubles;
use log::*;
use serde_json::Value;

use crate::{
    config::{ServerOptions, SignatureMode},
    data_objects::JsonResponse,
    errors::{AuthError, ServerError},
    helpers::verify_hmac,
    mailer::Mailer,
};

crate::route!(easydonate_webhook => Post "/webhooks/easydonate" impl StorefrontBackend);

/// A payment notification after normalisation. All fields are kept as the raw strings the provider sent;
/// the signature covers those raw values, so parsing must not reformat them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookNotification {
    pub payment_id: String,
    pub cost: String,
    pub customer: String,
    pub signature: Option<String>,
}

impl WebhookNotification {
    /// The string the provider signs.
    pub fn signed_payload(&self) -> String {
        format!("{}@{}@{}", self.payment_id, self.cost, self.customer)
    }

    pub fn cost_in_rubles(&self) -> Option<Rubles> {
        self.cost.trim().parse::<f64>().ok().filter(|c| c.is_finite() && *c >= 0.0).map(Rubles::from_rounded)
    }
}

pub async fn easydonate_webhook<B>(
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
    mailer: web::Data<Mailer>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    trace!("📬️ Webhook delivery received ({} bytes)", body.len());
    let notification = parse_notification(&body).ok_or_else(|| {
        warn!("📬️ Webhook delivery could not be parsed");
        ServerError::InvalidRequestBody("Unrecognised notification format".to_string())
    })?;
    let Some(cost) = notification.cost_in_rubles() else {
        warn!("📬️ Webhook delivery for [{}] carries an invalid cost: {}", notification.payment_id, notification.cost);
        return Err(ServerError::InvalidRequestBody("Invalid cost".to_string()));
    };

    let shop_key = options.shop_key.reveal();
    if shop_key.is_empty() {
        error!("📬️ Webhook delivery received, but no shop key is configured. Cannot verify anything.");
        return Err(ServerError::ConfigurationError("The payment provider shop key is not configured.".to_string()));
    }
    let signature_ok = notification
        .signature
        .as_deref()
        .map(|sig| verify_hmac(shop_key, &notification.signed_payload(), sig))
        .unwrap_or(false);
    if !signature_ok {
        match options.signature_mode {
            SignatureMode::Strict => {
                warn!("📬️ Rejecting webhook delivery for [{}]: bad or missing signature", notification.payment_id);
                return Err(AuthError::InvalidWebhookSignature.into());
            },
            SignatureMode::Lenient => {
                // No trustworthy signature. Accept only when the stored order corroborates what the
                // notification claims.
                let Some(stored) = api.payment_by_external_id(&notification.payment_id).await? else {
                    info!("📬️ Unsigned notification for unknown payment [{}]. Ignored.", notification.payment_id);
                    return Ok(HttpResponse::Ok().json(JsonResponse::success("OK")));
                };
                let nickname_matches = stored.order.nickname.eq_ignore_ascii_case(notification.customer.trim());
                let amount_matches = stored.payment.amount == cost;
                if !(nickname_matches && amount_matches) {
                    warn!(
                        "📬️ Rejecting unsigned webhook delivery for [{}]: the stored order does not corroborate it",
                        notification.payment_id
                    );
                    return Err(AuthError::InvalidWebhookSignature.into());
                }
                info!("📬️ Accepting unsigned webhook delivery for [{}] on corroboration", notification.payment_id);
            },
        }
    }

    match api.finalize_payment(&notification.payment_id, cost).await? {
        FinalizeOutcome::UnknownPayment => {
            info!("📬️ Notification for unknown payment [{}] acknowledged", notification.payment_id);
        },
        FinalizeOutcome::AlreadySettled(record) => {
            info!("📬️ Repeat delivery for settled payment [{}] (order #{})", notification.payment_id, record.order.id);
        },
        FinalizeOutcome::Completed { record, thank_you } => {
            info!(
                "📬️ Payment [{}] settled for {cost}. Order #{} is complete.",
                notification.payment_id, record.order.id
            );
            if let Some(coupon) = thank_you {
                mailer.send_thank_you_coupon(&record.buyer_email, &record.order.nickname, &coupon).await;
            }
        },
    }
    Ok(HttpResponse::Ok().json(JsonResponse::success("OK")))
}

//----------------------------------------------   Parsing  ----------------------------------------------------

/// Try the known delivery shapes in order: a JSON object, a form-encoded body, and a form-encoded body whose
/// `payload` field carries the JSON.
pub fn parse_notification(body: &[u8]) -> Option<WebhookNotification> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        if let Some(notification) = from_json_object(&value) {
            return Some(notification);
        }
    }
    let form: HashMap<String, String> = serde_urlencoded::from_bytes(body).ok()?;
    if let Some(payload) = form.get("payload") {
        if let Ok(value) = serde_json::from_str::<Value>(payload) {
            if let Some(notification) = from_json_object(&value) {
                return Some(notification);
            }
        }
    }
    let payment_id = non_empty(form.get("payment_id").cloned())?;
    let cost = non_empty(form.get("cost").cloned())?;
    let customer = non_empty(form.get("customer").cloned())?;
    let signature = non_empty(form.get("signature").cloned());
    Some(WebhookNotification { payment_id, cost, customer, signature })
}

fn from_json_object(value: &Value) -> Option<WebhookNotification> {
    let object = value.as_object()?;
    let payment_id = non_empty(object.get("payment_id").and_then(stringify))?;
    let cost = non_empty(object.get("cost").and_then(stringify))?;
    let customer = non_empty(object.get("customer").and_then(stringify))?;
    let signature = non_empty(object.get("signature").and_then(stringify));
    Some(WebhookNotification { payment_id, cost, customer, signature })
}

/// Numbers and strings both normalise to the string the provider would have signed.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
