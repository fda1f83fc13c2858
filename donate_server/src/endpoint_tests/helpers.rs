use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{Duration, Utc};
use donate_engine::db_types::{
    AuditEntry,
    Buyer,
    NewAuditEntry,
    Order,
    OrderStatusType,
    Payment,
    PaymentStatusType,
    PaymentWithOrder,
    Product,
    ProductCategory,
    ProductStatus,
    Role,
    PAYMENT_PROVIDER,
};
use dpg_common::{Rubles, Secret};

use crate::config::{ServerOptions, SignatureMode};

pub const TEST_SHOP_KEY: &str = "test-shop-key";

pub fn test_options(signature_mode: SignatureMode) -> ServerOptions {
    ServerOptions {
        default_server_id: Some(1),
        success_url: None,
        order_expiry: Duration::zero(),
        signature_mode,
        shop_key: Secret::new(TEST_SHOP_KEY.to_string()),
    }
}

pub fn make_product(id: i64, name: &str, price: i64, category: ProductCategory, rank: Option<i64>) -> Product {
    let now = Utc::now();
    Product {
        id,
        name: name.to_string(),
        description: format!("{name} description"),
        category,
        price: Rubles::new(price),
        highlight: None,
        commands: None,
        region_limit: None,
        privilege_rank: rank,
        status: ProductStatus::Active,
        easydonate_product_id: Some(format!("{}", 100 + id)),
        easydonate_server_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn make_payment_with_order(
    external_id: &str,
    nickname: &str,
    amount: i64,
    order_status: OrderStatusType,
    payment_status: PaymentStatusType,
) -> PaymentWithOrder {
    let now = Utc::now();
    let order = Order {
        id: 1,
        buyer_id: 1,
        product_id: 1,
        nickname: nickname.to_string(),
        status: order_status,
        promo_code_input: None,
        created_at: now,
        updated_at: now,
    };
    let payment = Payment {
        id: 1,
        order_id: 1,
        provider: PAYMENT_PROVIDER.to_string(),
        amount: Rubles::new(amount),
        currency: "RUB".to_string(),
        status: payment_status,
        external_id: external_id.to_string(),
        created_at: now,
        updated_at: now,
    };
    PaymentWithOrder { payment, order, buyer_email: "steve@example.com".to_string() }
}

pub fn make_buyer(email: &str) -> Buyer {
    Buyer {
        id: 1,
        email: email.to_string(),
        role: Role::Buyer,
        credential: "test-credential".to_string(),
        created_at: Utc::now(),
    }
}

/// Echo a [`NewAuditEntry`] back as the stored row, the way the real backend would.
pub fn stored_audit_entry(entry: NewAuditEntry) -> AuditEntry {
    AuditEntry {
        id: 1,
        buyer_id: entry.buyer_id,
        action: entry.action,
        entity: entry.entity,
        entity_id: entry.entity_id,
        metadata: entry.metadata.map(|m| m.to_string()),
        created_at: Utc::now(),
    }
}

pub async fn post_request(
    path: &str,
    body: impl Into<Vec<u8>>,
    options: ServerOptions,
    configure: impl FnOnce(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.into())
        .to_request();
    let app = App::new().app_data(web::Data::new(options)).configure(configure);
    let service = test::init_service(app).await;
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}
