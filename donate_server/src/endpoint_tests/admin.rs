use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::Utc;
use donate_engine::{
    db_types::{AuditEntry, OrderStatusType},
    order_objects::OrderSummary,
    AuditApi,
    OrderFlowApi,
};
use dpg_common::Secret;

use super::{
    helpers::{make_payment_with_order, test_options},
    mocks::MockBackend,
};
use crate::{
    config::SignatureMode,
    middleware::AdminKeyMiddlewareFactory,
    routes::{AdminAuditRoute, AdminOrderUpdateRoute, AdminOrdersRoute},
};

const ADMIN_KEY: &str = "test-admin-key";

/// Fire a request against an `/api` scope guarded the way the real server guards it.
async fn admin_request(
    req: TestRequest,
    configured_key: Option<&str>,
    configure: impl FnOnce(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let key = configured_key.map(|k| Secret::new(k.to_string()));
    let scope = web::scope("/api").wrap(AdminKeyMiddlewareFactory::new(key)).configure(configure);
    let app = App::new()
        .app_data(web::Data::new(test_options(SignatureMode::Strict)))
        .service(scope);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

fn audit_backend() -> MockBackend {
    let mut backend = MockBackend::new();
    backend.expect_fetch_audit_entries().returning(|limit| {
        assert_eq!(limit, 100);
        Ok(vec![AuditEntry {
            id: 1,
            buyer_id: None,
            action: "ORDER_CREATE".to_string(),
            entity: "order".to_string(),
            entity_id: Some("1".to_string()),
            metadata: None,
            created_at: Utc::now(),
        }])
    });
    backend
}

fn configure_audit(cfg: &mut ServiceConfig, backend: MockBackend) {
    cfg.service(AdminAuditRoute::<MockBackend>::new()).app_data(web::Data::new(AuditApi::new(backend)));
}

#[actix_web::test]
async fn admin_endpoints_are_disabled_without_a_configured_key() {
    let _ = env_logger::try_init().ok();
    let backend = audit_backend();
    let req = TestRequest::get().uri("/api/audit").insert_header(("Authorization", "Bearer whatever"));
    let err = admin_request(req, None, move |cfg| configure_audit(cfg, backend))
        .await
        .expect_err("Expected error");
    assert!(err.contains("not configured"), "unexpected error: {err}");
}

#[actix_web::test]
async fn a_wrong_or_missing_key_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let backend = audit_backend();
    let req = TestRequest::get().uri("/api/audit").insert_header(("Authorization", "Bearer wrong-key"));
    let err = admin_request(req, Some(ADMIN_KEY), move |cfg| configure_audit(cfg, backend))
        .await
        .expect_err("Expected error");
    assert!(err.contains("Invalid or missing admin API key"), "unexpected error: {err}");

    let backend = audit_backend();
    let req = TestRequest::get().uri("/api/audit");
    let err = admin_request(req, Some(ADMIN_KEY), move |cfg| configure_audit(cfg, backend))
        .await
        .expect_err("Expected error");
    assert!(err.contains("Invalid or missing admin API key"), "unexpected error: {err}");
}

#[actix_web::test]
async fn the_right_key_reads_the_audit_trail() {
    let _ = env_logger::try_init().ok();
    let backend = audit_backend();
    let req = TestRequest::get().uri("/api/audit").insert_header(("Authorization", format!("Bearer {ADMIN_KEY}")));
    let (status, body) = admin_request(req, Some(ADMIN_KEY), move |cfg| configure_audit(cfg, backend))
        .await
        .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ORDER_CREATE"));
}

#[actix_web::test]
async fn the_order_list_carries_the_summary() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_search_orders().returning(|_| Ok(vec![]));
    backend.expect_order_summary().returning(|| {
        Ok(OrderSummary { total: 3, pending: 1, completed: 2, ..Default::default() })
    });
    let req = TestRequest::get()
        .uri("/api/orders?status=Pending")
        .insert_header(("Authorization", format!("Bearer {ADMIN_KEY}")));
    let (status, body) = admin_request(req, Some(ADMIN_KEY), move |cfg| {
        cfg.service(AdminOrdersRoute::<MockBackend>::new())
            .app_data(web::Data::new(OrderFlowApi::new(backend)));
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"total\":3"));
    assert!(body.contains("\"completed\":2"));
}

#[actix_web::test]
async fn a_status_override_is_audited() {
    let _ = env_logger::try_init().ok();
    let mut backend = MockBackend::new();
    backend.expect_fetch_order_with_relations().returning(|_| {
        let record =
            make_payment_with_order("ext-1", "Steve", 349, OrderStatusType::Pending, donate_engine::db_types::PaymentStatusType::Pending);
        Ok(Some(donate_engine::order_objects::OrderWithRelations {
            order: record.order,
            product: super::helpers::make_product(1, "VIP", 349, donate_engine::db_types::ProductCategory::Privilege, Some(1)),
            payment: Some(record.payment),
            buyer_email: record.buyer_email,
        }))
    });
    backend.expect_set_order_status().withf(|id, status| *id == 1 && *status == OrderStatusType::Cancelled).returning(
        |_, status| {
            let record = make_payment_with_order(
                "ext-1",
                "Steve",
                349,
                status,
                donate_engine::db_types::PaymentStatusType::Cancelled,
            );
            Ok(donate_engine::order_objects::OrderWithRelations {
                order: record.order,
                product: super::helpers::make_product(
                    1,
                    "VIP",
                    349,
                    donate_engine::db_types::ProductCategory::Privilege,
                    Some(1),
                ),
                payment: Some(record.payment),
                buyer_email: record.buyer_email,
            })
        },
    );
    backend
        .expect_insert_audit_entry()
        .withf(|entry| entry.action == "ORDER_UPDATE")
        .returning(|entry| Ok(super::helpers::stored_audit_entry(entry)));
    let req = TestRequest::patch()
        .uri("/api/orders/1")
        .insert_header(("Authorization", format!("Bearer {ADMIN_KEY}")))
        .set_json(serde_json::json!({ "status": "Cancelled" }));
    let (status, body) = admin_request(req, Some(ADMIN_KEY), move |cfg| {
        cfg.service(AdminOrderUpdateRoute::<MockBackend>::new())
            .app_data(web::Data::new(OrderFlowApi::new(backend)));
    })
    .await
    .expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"Cancelled\""));
}
