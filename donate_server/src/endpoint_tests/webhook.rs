use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::Utc;
use donate_engine::{
    db_types::{Coupon, NewCoupon, OrderStatusType, PaymentStatusType},
    OrderFlowApi,
};
use dpg_common::Rubles;

use super::{
    helpers::{make_payment_with_order, post_request, stored_audit_entry, test_options, TEST_SHOP_KEY},
    mocks::MockBackend,
};
use crate::{
    config::{MailerConfig, SignatureMode},
    helpers::calculate_hmac,
    mailer::Mailer,
    webhook::EasydonateWebhookRoute,
};

fn stored_coupon(coupon: NewCoupon) -> Coupon {
    Coupon {
        id: 1,
        code: coupon.code,
        discount_percent: coupon.discount_percent,
        expires_at: coupon.expires_at,
        used: false,
        used_at: None,
        issued_for_email: coupon.issued_for_email,
        issued_for_buyer_id: coupon.issued_for_buyer_id,
        issued_for_order_id: coupon.issued_for_order_id,
        created_at: Utc::now(),
    }
}

fn register(cfg: &mut ServiceConfig, backend: MockBackend) {
    cfg.service(EasydonateWebhookRoute::<MockBackend>::new())
        .app_data(web::Data::new(OrderFlowApi::new(backend)))
        .app_data(web::Data::new(Mailer::new(MailerConfig::default())));
}

fn signed_body(payment_id: &str, cost: &str, customer: &str) -> String {
    let signature = calculate_hmac(TEST_SHOP_KEY, &format!("{payment_id}@{cost}@{customer}"));
    format!(
        r#"{{"payment_id": "{payment_id}", "cost": "{cost}", "customer": "{customer}", "signature": "{signature}"}}"#
    )
}

#[actix_web::test]
async fn a_signed_notification_settles_the_payment() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_id().returning(|id| {
        Ok(Some(make_payment_with_order(id, "Steve", 349, OrderStatusType::Pending, PaymentStatusType::Pending)))
    });
    backend
        .expect_mark_payment_received()
        .withf(|_, amount| *amount == Rubles::new(349))
        .returning(|_, amount| {
            let mut record = make_payment_with_order(
                "ext-1",
                "Steve",
                amount.value(),
                OrderStatusType::Completed,
                PaymentStatusType::Received,
            );
            record.payment.amount = amount;
            Ok(record)
        });
    backend.expect_thank_you_coupon_exists().returning(|_| Ok(false));
    backend.expect_insert_coupon().returning(|coupon| Ok(stored_coupon(coupon)));
    backend.expect_insert_audit_entry().returning(|entry| Ok(stored_audit_entry(entry)));
    let body = signed_body("ext-1", "349", "Steve");
    let (status, response) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"));
}

#[actix_web::test]
async fn a_tampered_signature_is_rejected_in_strict_mode() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_id().never();
    backend.expect_mark_payment_received().never();
    // Signature computed over a different cost than the one delivered.
    let signature = calculate_hmac(TEST_SHOP_KEY, "ext-1@999@Steve");
    let body = format!(
        r#"{{"payment_id": "ext-1", "cost": "349", "customer": "Steve", "signature": "{signature}"}}"#
    );
    let (status, response) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.contains("signature"));
}

#[actix_web::test]
async fn a_missing_signature_is_rejected_in_strict_mode() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_mark_payment_received().never();
    let body = r#"{"payment_id": "ext-1", "cost": "349", "customer": "Steve"}"#;
    let (status, _) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn repeat_deliveries_are_acknowledged_without_writes() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_id().returning(|id| {
        Ok(Some(make_payment_with_order(id, "Steve", 349, OrderStatusType::Completed, PaymentStatusType::Received)))
    });
    backend.expect_mark_payment_received().never();
    backend.expect_insert_audit_entry().never();
    let body = signed_body("ext-1", "349", "Steve");
    let (status, response) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"));
}

#[actix_web::test]
async fn unknown_payments_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_id().returning(|_| Ok(None));
    backend.expect_mark_payment_received().never();
    let body = signed_body("no-such-payment", "100", "Steve");
    let (status, response) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Strict), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"));
}

#[actix_web::test]
async fn lenient_mode_accepts_an_unsigned_corroborated_notification() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    // Once for corroboration, once inside the settlement. Already settled, so nothing is written.
    backend.expect_fetch_payment_by_external_id().times(2).returning(|id| {
        Ok(Some(make_payment_with_order(id, "Steve", 349, OrderStatusType::Completed, PaymentStatusType::Received)))
    });
    backend.expect_mark_payment_received().never();
    let body = r#"{"payment_id": "ext-1", "cost": "349", "customer": "STEVE"}"#;
    let (status, response) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Lenient), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"));
}

#[actix_web::test]
async fn lenient_mode_rejects_an_unsigned_mismatch() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_id().returning(|id| {
        Ok(Some(make_payment_with_order(id, "Steve", 349, OrderStatusType::Pending, PaymentStatusType::Pending)))
    });
    backend.expect_mark_payment_received().never();
    // The delivered cost does not match the stored amount.
    let body = r#"{"payment_id": "ext-1", "cost": "1", "customer": "Steve"}"#;
    let (status, _) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Lenient), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn lenient_mode_ignores_an_unsigned_unknown_payment() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_payment_by_external_id().times(1).returning(|_| Ok(None));
    backend.expect_mark_payment_received().never();
    let body = r#"{"payment_id": "no-such-payment", "cost": "349", "customer": "Steve"}"#;
    let (status, response) =
        post_request("/webhooks/easydonate", body, test_options(SignatureMode::Lenient), move |cfg| {
            register(cfg, backend)
        })
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"));
}

#[actix_web::test]
async fn garbage_bodies_and_bad_costs_are_rejected() {
    let _ = env_logger::try_init().ok();
    for body in ["not a notification", r#"{"payment_id": "1", "cost": "minus five", "customer": "Steve"}"#] {
        let mut backend = MockBackend::new();
        backend.expect_mark_payment_received().never();
        let (status, _) =
            post_request("/webhooks/easydonate", body, test_options(SignatureMode::Strict), move |cfg| {
                register(cfg, backend)
            })
            .await
            .expect("Request failed");
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body} should have been rejected");
    }
}
