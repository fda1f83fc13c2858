use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde_json::{json, Value};

use crate::{
    cache::CatalogCache,
    data_objects::{
        coerce_id,
        coerce_price,
        ApiEnvelope,
        CreatePaymentRequest,
        PaymentSession,
        PaymentSessionPayload,
        RemoteProduct,
        RemoteProductPayload,
        SurchargePayload,
        SurchargeQuote,
    },
    EasyDonateApiError,
    EasyDonateConfig,
};

const SURCHARGE_PLUGIN_PATH: &str = "/plugin/EasyDonate.Surcharge/getDiscountFor";

/// The gateway operations the storefront needs. Checkout and catalog handlers are generic over this trait so that
/// endpoint tests can substitute a mock for the live EasyDonate client.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Fetch the product catalog for the given provider server, subject to the client's cache.
    async fn products_for_server(&self, server_id: i64) -> Result<Arc<Vec<RemoteProduct>>, EasyDonateApiError>;

    /// Create a payment session and return the redirect URL plus the authoritative cost.
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<PaymentSession, EasyDonateApiError>;

    /// Ask the Surcharge plugin whether a stacking discount applies for this nickname and product. Failures and
    /// non-positive discounts both collapse to `None`; this call must never block a checkout.
    async fn surcharge_for(&self, nickname: &str, product_id: &str, server_id: Option<i64>) -> Option<SurchargeQuote>;
}

#[derive(Clone)]
pub struct EasyDonateApi {
    config: EasyDonateConfig,
    client: Arc<Client>,
    catalog_cache: Arc<CatalogCache>,
}

impl EasyDonateApi {
    pub fn new(config: EasyDonateConfig) -> Result<Self, EasyDonateApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        let key = HeaderValue::from_str(config.shop_key.reveal().as_str())
            .map_err(|e| EasyDonateApiError::Initialization(e.to_string()))?;
        headers.insert("Shop-Key", key);
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.call_timeout)
            .build()
            .map_err(|e| EasyDonateApiError::Initialization(e.to_string()))?;
        let catalog_cache = Arc::new(CatalogCache::new(config.catalog_cache_ttl));
        Ok(Self { config, client: Arc::new(client), catalog_cache })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Issue a GET against the given path and unwrap the standard EasyDonate envelope, returning the inner payload.
    async fn envelope_query(
        &self,
        path: &str,
        params: &[(&str, String)],
        fallback_message: &str,
    ) -> Result<Value, EasyDonateApiError> {
        let url = self.url(path);
        trace!("Sending EasyDonate query: {url}");
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| EasyDonateApiError::RequestError(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(EasyDonateApiError::QueryError { status, message });
        }
        let envelope =
            response.json::<ApiEnvelope>().await.map_err(|e| EasyDonateApiError::JsonError(e.to_string()))?;
        if !envelope.success {
            return Err(EasyDonateApiError::ApiFailure(envelope.failure_message(fallback_message)));
        }
        envelope.response.ok_or_else(|| EasyDonateApiError::MalformedResponse("empty response payload".to_string()))
    }
}

impl PaymentGateway for EasyDonateApi {
    async fn products_for_server(&self, server_id: i64) -> Result<Arc<Vec<RemoteProduct>>, EasyDonateApiError> {
        if server_id <= 0 {
            return Err(EasyDonateApiError::InvalidServerId(server_id));
        }
        if let Some(cached) = self.catalog_cache.get(server_id).await {
            trace!("Catalog cache hit for server {server_id}");
            return Ok(cached);
        }
        let params = [("server_id", server_id.to_string())];
        let payload =
            self.envelope_query("/shop/products", &params, "Could not fetch the EasyDonate catalog").await?;
        let raw: Vec<RemoteProductPayload> =
            serde_json::from_value(payload).map_err(|e| EasyDonateApiError::JsonError(e.to_string()))?;
        let products: Vec<RemoteProduct> = raw.into_iter().map(RemoteProduct::from).collect();
        debug!("Fetched {} products for EasyDonate server {server_id}", products.len());
        Ok(self.catalog_cache.put(server_id, products).await)
    }

    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<PaymentSession, EasyDonateApiError> {
        if request.server_id <= 0 {
            return Err(EasyDonateApiError::InvalidServerId(request.server_id));
        }
        let products = json!({ &request.product_id: 1 }).to_string();
        let mut params = vec![
            ("customer", request.customer.clone()),
            ("server_id", request.server_id.to_string()),
            ("products", products),
            ("email", request.email.clone()),
        ];
        if let Some(coupon) = &request.coupon {
            params.push(("coupon", coupon.clone()));
        }
        if let Some(success_url) = &request.success_url {
            params.push(("success_url", success_url.clone()));
        }
        let payload =
            self.envelope_query("/shop/payment/create", &params, "Could not create the payment session").await?;
        let session: PaymentSessionPayload =
            serde_json::from_value(payload).map_err(|e| EasyDonateApiError::JsonError(e.to_string()))?;
        let url = session
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| EasyDonateApiError::MalformedResponse("no payment url".to_string()))?;
        let payment = session
            .payment
            .ok_or_else(|| EasyDonateApiError::MalformedResponse("no payment record".to_string()))?;
        let payment_id = coerce_id(payment.id.as_ref())
            .ok_or_else(|| EasyDonateApiError::MalformedResponse("no payment id".to_string()))?;
        let cost = payment.cost.map(dpg_common::Rubles::from_rounded);
        info!("Created EasyDonate payment session {payment_id}");
        Ok(PaymentSession { url, payment_id, cost })
    }

    async fn surcharge_for(&self, nickname: &str, product_id: &str, server_id: Option<i64>) -> Option<SurchargeQuote> {
        if nickname.is_empty() || product_id.is_empty() || !self.config.is_configured() {
            return None;
        }
        let mut params = vec![("username", nickname.to_string()), ("product_id", product_id.to_string())];
        if let Some(id) = server_id.filter(|id| *id > 0) {
            params.push(("server_id", id.to_string()));
        }
        let payload = match self.envelope_query(SURCHARGE_PLUGIN_PATH, &params, "No discount available").await {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Surcharge lookup failed for {nickname}/{product_id}: {e}");
                return None;
            },
        };
        let quote: SurchargePayload = match serde_json::from_value(payload) {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Surcharge payload for {nickname}/{product_id} was malformed: {e}");
                return None;
            },
        };
        let amount = coerce_price(quote.discount.as_ref());
        if amount.value() <= 0 {
            debug!("Surcharge discount for {nickname}/{product_id} is zero or invalid");
            return None;
        }
        Some(SurchargeQuote {
            amount,
            discount_product_id: coerce_id(quote.id.as_ref()),
            target_product_id: quote.target.and_then(|t| coerce_id(t.id.as_ref())),
        })
    }
}
