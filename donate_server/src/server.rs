use std::time::Duration;

use actix_web::{http::KeepAlive, middleware::Logger, web, App, HttpServer};
use chrono::Duration as ChronoDuration;
use donate_engine::{AuditApi, OrderFlowApi, ProductApi, SqliteDatabase};
use easydonate_tools::EasyDonateApi;
use log::*;

use crate::{
    checkout::CheckoutRoute,
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    mailer::Mailer,
    middleware::AdminKeyMiddlewareFactory,
    routes::{
        health,
        AdminAuditDeleteRoute,
        AdminAuditRoute,
        AdminOrderUpdateRoute,
        AdminOrdersExportRoute,
        AdminOrdersRoute,
        AdminProductCreateRoute,
        AdminProductDeleteRoute,
        AdminProductUpdateRoute,
        AdminProductsRoute,
        ShopProductsRoute,
    },
    webhook::EasydonateWebhookRoute,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.order_expiry > ChronoDuration::zero() {
        let _handle = start_expiry_worker(db.clone(), config.order_expiry);
    } else {
        info!("🚀️ No order expiry window is configured. Pending orders never expire.");
    }
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<actix_web::dev::Server, ServerError> {
    info!("🚀️ Starting donation storefront server on {}:{}", config.host, config.port);
    let gateway = EasyDonateApi::new(config.easydonate.clone())
        .map_err(|e| ServerError::InitializeError(format!("Could not build the EasyDonate client. {e}")))?;
    // The factory closure takes ownership of `config`, so grab the bind address first.
    let bind_addr = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone());
        let products_api = ProductApi::new(db.clone());
        let audit_api = AuditApi::new(db.clone());
        let gateway = gateway.clone();
        let mailer = Mailer::new(config.mailer.clone());
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("dpg::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(products_api))
            .app_data(web::Data::new(audit_api))
            .app_data(web::Data::new(gateway))
            .app_data(web::Data::new(mailer))
            .app_data(web::Data::new(options));
        // Routes that require the admin API key
        let admin_scope = web::scope("/api")
            .wrap(AdminKeyMiddlewareFactory::new(config.admin_api_key.clone()))
            .service(AdminOrdersExportRoute::<SqliteDatabase>::new())
            .service(AdminOrdersRoute::<SqliteDatabase>::new())
            .service(AdminOrderUpdateRoute::<SqliteDatabase>::new())
            .service(AdminProductsRoute::<SqliteDatabase>::new())
            .service(AdminProductCreateRoute::<SqliteDatabase>::new())
            .service(AdminProductUpdateRoute::<SqliteDatabase>::new())
            .service(AdminProductDeleteRoute::<SqliteDatabase>::new())
            .service(AdminAuditRoute::<SqliteDatabase>::new())
            .service(AdminAuditDeleteRoute::<SqliteDatabase>::new());
        app.service(health)
            .service(ShopProductsRoute::<SqliteDatabase, EasyDonateApi>::new())
            .service(CheckoutRoute::<SqliteDatabase, EasyDonateApi>::new())
            .service(EasydonateWebhookRoute::<SqliteDatabase>::new())
            .service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_addr)?
    .run();
    Ok(srv)
}
