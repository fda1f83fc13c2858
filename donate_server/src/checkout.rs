//! The public checkout endpoint.
//!
//! This is the busiest handler in the server, so it lives in its own module. It walks the full pipeline:
//! validation, tier guard, surcharge and coupon pricing, payment-session creation against EasyDonate, and
//! finally the transactional persist of the pending order with its payment leg.

use actix_web::{web, HttpResponse};
use donate_engine::{
    db_types::NewPayment,
    pricing::price_order,
    tier::{check_tier, TierCheck},
    traits::StorefrontBackend,
    CheckoutDiscounts,
    OrderFlowApi,
};
use easydonate_tools::{CreatePaymentRequest, PaymentGateway};
use log::*;

use crate::{
    config::ServerOptions,
    data_objects::{CheckoutRequest, CheckoutResponse},
    errors::ServerError,
    helpers::{is_valid_email, is_valid_nickname, random_credential},
    routes::sweep_expired_orders,
};

crate::route!(checkout => Post "/orders" impl StorefrontBackend, PaymentGateway);

/// Create a pending order and an EasyDonate payment session for it.
///
/// The provider's reported cost, when present, is what gets persisted on the payment leg; the locally
/// computed breakdown is only an estimate. If the provider call fails nothing is persisted and the client
/// gets a 502.
pub async fn checkout<B, G>(
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<G>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
    G: PaymentGateway,
{
    let request = body.into_inner();
    trace!("🛒️ Checkout request for product #{} by {}", request.product_id, request.nickname);
    if options.shop_key.reveal().is_empty() {
        error!("🛒️ Checkout request received, but no shop key is configured. Orders cannot be placed.");
        return Err(ServerError::ConfigurationError("The payment provider shop key is not configured.".to_string()));
    }
    sweep_expired_orders(&api, options.order_expiry).await;

    let email = request.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ServerError::ValidationError("A valid e-mail address is required.".to_string()));
    }
    let nickname = request.nickname.trim().to_string();
    if !is_valid_nickname(&nickname) {
        return Err(ServerError::ValidationError(
            "Nicknames are 3 to 16 letters, digits or underscores.".to_string(),
        ));
    }
    // Codes are stored upper-cased, so normalise the input the same way before lookup and persistence.
    let promo_code = request.promo_code.map(|c| c.trim().to_uppercase()).filter(|c| !c.is_empty());

    let product = api.fetch_active_product(request.product_id).await?;
    let Some(provider_product_id) = product.easydonate_product_id.clone() else {
        warn!("🛒️ Product #{} has no EasyDonate product id and cannot be sold online", product.id);
        return Err(ServerError::ConfigurationError(format!(
            "Product {} is not linked to the payment provider.",
            product.id
        )));
    };
    let Some(server_id) = product.easydonate_server_id.or(options.default_server_id) else {
        warn!("🛒️ Product #{} has no EasyDonate server id and no default is configured", product.id);
        return Err(ServerError::ConfigurationError(format!(
            "Product {} is not linked to a game server.",
            product.id
        )));
    };

    // Tier guard. Runs on completed orders only; a pending order for a privilege does not block another try.
    let owned = api.completed_privileges(&nickname).await?;
    let tier = check_tier(&product, &owned);
    match &tier {
        TierCheck::DuplicatePrivilege { product } => {
            debug!("🛒️ {nickname} already owns {product}");
            return Err(ServerError::TierViolation(format!("You already own {product}.")));
        },
        TierCheck::Downgrade { candidate, owned } => {
            debug!("🛒️ {nickname} tried to downgrade from {owned} to {candidate}");
            return Err(ServerError::TierViolation(format!(
                "You already own {owned}, which outranks {candidate}. Downgrades are not available.",
            )));
        },
        TierCheck::Upgrade { credit, traded_in } => {
            debug!("🛒️ {nickname} upgrades from {traded_in} with {credit} credit");
        },
        TierCheck::NotApplicable => {},
    }

    // The Surcharge plugin may quote its own trade-in discount, possibly against a substitute product that
    // already carries the reduced price. Whichever credit is larger wins; they never stack.
    let quote = gateway.surcharge_for(&nickname, &provider_product_id, Some(server_id)).await;
    let mut charged_product_id = provider_product_id;
    let mut credit = tier.credit().unwrap_or_default();
    if let Some(quote) = &quote {
        if quote.amount > credit {
            credit = quote.amount;
        }
        if let Some(substitute) = &quote.discount_product_id {
            charged_product_id = substitute.clone();
        }
    }

    let coupon = match &promo_code {
        Some(code) => Some(api.resolve_coupon(code, &email).await?),
        None => None,
    };
    let pricing = price_order(
        product.price,
        Some(credit).filter(|c| c.value() > 0),
        coupon.as_ref().map(|c| c.discount_percent),
    );

    // The provider applies the coupon server-side, so it has to travel with the session request. We pass the
    // canonical code from the resolved coupon rather than whatever casing the buyer typed.
    let session_request = CreatePaymentRequest {
        customer: nickname.clone(),
        server_id,
        product_id: charged_product_id,
        email: email.clone(),
        coupon: coupon.as_ref().map(|c| c.code.clone()),
        success_url: options.success_url.clone(),
    };
    let session = gateway.create_payment(&session_request).await?;
    // The provider decides what the buyer is actually charged. Our breakdown is a fallback for providers
    // that omit the cost from the session response.
    let amount = session.cost.unwrap_or(pricing.payable);
    if session.cost.is_some() && amount != pricing.payable {
        info!(
            "🛒️ Provider cost {amount} differs from the local estimate {} for payment [{}]",
            pricing.payable, session.payment_id
        );
    }

    let payment = NewPayment::new(amount, session.payment_id.clone());
    let discounts = CheckoutDiscounts {
        requested_surcharge: credit,
        applied_surcharge: pricing.applied_surcharge,
        coupon_discount: pricing.coupon_discount,
        payable_estimate: pricing.payable,
    };
    let record = api
        .record_checkout(&email, &random_credential(), product.id, &nickname, promo_code, payment, discounts)
        .await?;
    info!(
        "🛒️ Order #{} created: {nickname} buys {} for {amount} (payment [{}])",
        record.order.id, product.name, session.payment_id
    );
    let discount = (product.price - amount).floor_at_zero();
    let response = CheckoutResponse {
        payment_url: session.url,
        payable_amount: amount.value(),
        discount: discount.value(),
    };
    Ok(HttpResponse::Created().json(response))
}
