use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use donate_engine::{
    db_types::{Coupon, NewOrder, NewPayment, Order, OwnedPrivilege, Payment, PaymentStatusType, ProductCategory},
    OrderFlowApi,
};
use dpg_common::{Rubles, Secret};
use easydonate_tools::{EasyDonateApiError, PaymentSession, SurchargeQuote};
use serde_json::Value;

use super::{
    helpers::{make_buyer, make_product, post_request, stored_audit_entry, test_options},
    mocks::{MockBackend, MockGateway},
};
use crate::{checkout::CheckoutRoute, config::SignatureMode};

fn stored_order(order: NewOrder) -> Order {
    let now = Utc::now();
    Order {
        id: 1,
        buyer_id: order.buyer_id,
        product_id: order.product_id,
        nickname: order.nickname,
        status: donate_engine::db_types::OrderStatusType::Pending,
        promo_code_input: order.promo_code_input,
        created_at: now,
        updated_at: now,
    }
}

fn stored_payment(payment: NewPayment) -> Payment {
    let now = Utc::now();
    Payment {
        id: 1,
        order_id: 1,
        provider: donate_engine::db_types::PAYMENT_PROVIDER.to_string(),
        amount: payment.amount,
        currency: payment.currency,
        status: PaymentStatusType::Pending,
        external_id: payment.external_id,
        created_at: now,
        updated_at: now,
    }
}

fn valid_coupon(code: &str) -> Coupon {
    Coupon {
        id: 7,
        code: code.to_string(),
        discount_percent: 10,
        expires_at: Utc::now() + Duration::days(1),
        used: false,
        used_at: None,
        issued_for_email: None,
        issued_for_buyer_id: None,
        issued_for_order_id: None,
        created_at: Utc::now(),
    }
}

fn configure_happy_backend(backend: &mut MockBackend) {
    backend.expect_fetch_or_create_buyer().returning(|email, _| Ok(make_buyer(email)));
    backend
        .expect_insert_order_with_payment()
        .returning(|order, payment| Ok((stored_order(order), stored_payment(payment))));
    backend.expect_insert_audit_entry().returning(|entry| Ok(stored_audit_entry(entry)));
}

fn register(cfg: &mut ServiceConfig, backend: MockBackend, gateway: MockGateway) {
    cfg.service(CheckoutRoute::<MockBackend, MockGateway>::new())
        .app_data(web::Data::new(OrderFlowApi::new(backend)))
        .app_data(web::Data::new(gateway));
}

const CHECKOUT_BODY: &str = r#"{"email": "steve@example.com", "nickname": "Steve", "productId": 5}"#;

#[actix_web::test]
async fn checkout_persists_the_provider_cost() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_product()
        .returning(|id| Ok(Some(make_product(id, "Diamond case", 1000, ProductCategory::Case, None))));
    backend.expect_completed_privileges_for().returning(|_| Ok(vec![]));
    backend.expect_fetch_or_create_buyer().returning(|email, _| Ok(make_buyer(email)));
    // The provider-reported cost is authoritative, so 950 is what must land on the payment leg.
    backend
        .expect_insert_order_with_payment()
        .withf(|_, payment| payment.amount == Rubles::new(950) && payment.external_id == "ext-1")
        .returning(|order, payment| Ok((stored_order(order), stored_payment(payment))));
    backend.expect_insert_audit_entry().returning(|entry| Ok(stored_audit_entry(entry)));
    let mut gateway = MockGateway::new();
    gateway.expect_surcharge_for().returning(|_, _, _| None);
    gateway.expect_create_payment().returning(|_| {
        Ok(PaymentSession {
            url: "https://easydonate.ru/pay/ext-1".to_string(),
            payment_id: "ext-1".to_string(),
            cost: Some(Rubles::new(950)),
        })
    });
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["paymentUrl"], "https://easydonate.ru/pay/ext-1");
    assert_eq!(response["payableAmount"], 950);
    assert_eq!(response["discount"], 50);
}

#[actix_web::test]
async fn checkout_rejects_a_downgrade() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_product()
        .returning(|id| Ok(Some(make_product(id, "VIP", 349, ProductCategory::Privilege, Some(1)))));
    backend.expect_completed_privileges_for().returning(|_| {
        Ok(vec![OwnedPrivilege {
            product_id: 9,
            name: "Premium".to_string(),
            price: Rubles::new(899),
            privilege_rank: Some(2),
        }])
    });
    backend.expect_insert_order_with_payment().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment().never();
    gateway.expect_surcharge_for().returning(|_, _, _| None);
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Downgrades are not available"));
}

#[actix_web::test]
async fn checkout_rejects_a_duplicate_privilege() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_product()
        .returning(|id| Ok(Some(make_product(id, "VIP", 349, ProductCategory::Privilege, Some(1)))));
    backend.expect_completed_privileges_for().returning(|_| {
        Ok(vec![OwnedPrivilege {
            product_id: 5,
            name: "VIP".to_string(),
            price: Rubles::new(349),
            privilege_rank: Some(1),
        }])
    });
    backend.expect_insert_order_with_payment().never();
    let gateway = MockGateway::new();
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("You already own VIP"));
}

#[actix_web::test]
async fn upgrade_credit_reduces_the_local_estimate() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_product()
        .returning(|id| Ok(Some(make_product(id, "Premium", 1000, ProductCategory::Privilege, Some(2)))));
    backend.expect_completed_privileges_for().returning(|_| {
        Ok(vec![OwnedPrivilege {
            product_id: 2,
            name: "VIP".to_string(),
            price: Rubles::new(300),
            privilege_rank: Some(1),
        }])
    });
    backend.expect_fetch_or_create_buyer().returning(|email, _| Ok(make_buyer(email)));
    // The provider session omits the cost, so the trade-in adjusted estimate is what gets persisted.
    backend
        .expect_insert_order_with_payment()
        .withf(|_, payment| payment.amount == Rubles::new(700))
        .returning(|order, payment| Ok((stored_order(order), stored_payment(payment))));
    backend.expect_insert_audit_entry().returning(|entry| Ok(stored_audit_entry(entry)));
    let mut gateway = MockGateway::new();
    gateway.expect_surcharge_for().returning(|_, _, _| None);
    gateway.expect_create_payment().returning(|_| {
        Ok(PaymentSession { url: "https://pay".to_string(), payment_id: "ext-2".to_string(), cost: None })
    });
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["payableAmount"], 700);
    assert_eq!(response["discount"], 300);
}

#[actix_web::test]
async fn a_surcharge_substitute_product_is_charged_instead() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_product()
        .returning(|id| Ok(Some(make_product(id, "Premium", 1000, ProductCategory::Case, None))));
    backend.expect_completed_privileges_for().returning(|_| Ok(vec![]));
    configure_happy_backend(&mut backend);
    let mut gateway = MockGateway::new();
    gateway.expect_surcharge_for().returning(|_, _, _| {
        Some(SurchargeQuote {
            amount: Rubles::new(400),
            discount_product_id: Some("999".to_string()),
            target_product_id: Some("105".to_string()),
        })
    });
    gateway
        .expect_create_payment()
        .withf(|request| request.product_id == "999")
        .returning(|_| {
            Ok(PaymentSession { url: "https://pay".to_string(), payment_id: "ext-3".to_string(), cost: None })
        });
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let response: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(response["payableAmount"], 600);
}

#[actix_web::test]
async fn a_promo_code_travels_to_the_gateway() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_product()
        .returning(|id| Ok(Some(make_product(id, "Diamond case", 1000, ProductCategory::Case, None))));
    backend.expect_completed_privileges_for().returning(|_| Ok(vec![]));
    backend.expect_fetch_coupon().withf(|code| code == "SAVE10").returning(|code| Ok(Some(valid_coupon(code))));
    backend.expect_fetch_or_create_buyer().returning(|email, _| Ok(make_buyer(email)));
    // The stored order carries the canonical upper-cased code even though the buyer typed it in lower case.
    backend
        .expect_insert_order_with_payment()
        .withf(|order, payment| {
            order.promo_code_input.as_deref() == Some("SAVE10") && payment.amount == Rubles::new(900)
        })
        .returning(|order, payment| Ok((stored_order(order), stored_payment(payment))));
    backend.expect_insert_audit_entry().returning(|entry| Ok(stored_audit_entry(entry)));
    let mut gateway = MockGateway::new();
    gateway.expect_surcharge_for().returning(|_, _, _| None);
    gateway
        .expect_create_payment()
        .withf(|request| request.coupon.as_deref() == Some("SAVE10"))
        .returning(|_| {
            Ok(PaymentSession { url: "https://pay".to_string(), payment_id: "ext-4".to_string(), cost: None })
        });
    let body = r#"{"email": "steve@example.com", "nickname": "Steve", "productId": 5, "promoCode": "save10"}"#;
    let (status, response) =
        post_request("/orders", body, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["payableAmount"], 900);
    assert_eq!(response["discount"], 100);
}

#[actix_web::test]
async fn checkout_is_disabled_without_a_shop_key() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_product().never();
    backend.expect_insert_order_with_payment().never();
    let mut gateway = MockGateway::new();
    gateway.expect_create_payment().never();
    let mut options = test_options(SignatureMode::Strict);
    options.shop_key = Secret::new(String::new());
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, options, move |cfg| register(cfg, backend, gateway))
            .await
            .expect("Request failed");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("shop key is not configured"));
}

#[actix_web::test]
async fn validation_failures_are_bad_requests() {
    let _ = env_logger::try_init().ok();
    for body in [
        r#"{"email": "not-an-email", "nickname": "Steve", "productId": 5}"#,
        r#"{"email": "steve@example.com", "nickname": "x", "productId": 5}"#,
        r#"{"email": "steve@example.com", "nickname": "bad nick!", "productId": 5}"#,
    ] {
        let mut backend = MockBackend::new();
        backend.expect_insert_order_with_payment().never();
        let gateway = MockGateway::new();
        let (status, _) = post_request("/orders", body, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} should have been rejected");
    }
}

#[actix_web::test]
async fn an_unknown_product_is_a_404() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_product().returning(|_| Ok(None));
    backend.expect_insert_order_with_payment().never();
    let gateway = MockGateway::new();
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("not available for purchase"));
}

#[actix_web::test]
async fn a_gateway_failure_persists_nothing() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend
        .expect_fetch_product()
        .returning(|id| Ok(Some(make_product(id, "Diamond case", 1000, ProductCategory::Case, None))));
    backend.expect_completed_privileges_for().returning(|_| Ok(vec![]));
    backend.expect_insert_order_with_payment().never();
    backend.expect_fetch_or_create_buyer().never();
    let mut gateway = MockGateway::new();
    gateway.expect_surcharge_for().returning(|_, _, _| None);
    gateway
        .expect_create_payment()
        .returning(|_| Err(EasyDonateApiError::RequestError("connection refused".to_string())));
    let (status, body) =
        post_request("/orders", CHECKOUT_BODY, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend, gateway)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    // The client gets the generic message, not the provider detail.
    assert!(body.contains("could not be reached"));
    assert!(!body.contains("connection refused"));
}
