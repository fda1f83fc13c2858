//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storefront backend and the payment gateway so that endpoint tests can run
//! against mocks. Since actix cannot register generic handlers directly, each route is declared with the
//! `route!` macro below, which generates a concrete `HttpServiceFactory` per route.

use std::collections::HashMap;

use actix_web::{get, web, HttpResponse, Responder};
use chrono::Duration;
use donate_engine::{
    db_types::{NewProduct, Product, UpdateProductRequest},
    order_objects::{OrderQueryFilter, OrderWithRelations},
    traits::StorefrontBackend,
    AuditApi,
    OrderFlowApi,
    ProductApi,
};
use easydonate_tools::{PaymentGateway, RemoteProduct};
use log::*;

use crate::{
    config::ServerOptions,
    data_objects::{AdminOrdersQuery, AuditQuery, JsonResponse, OrderListResponse, OrderStatusUpdate},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(shop_products => Get "/products" impl StorefrontBackend, PaymentGateway);
/// The public catalog: active products ordered by ascending price.
///
/// Products that are linked to an EasyDonate product are refreshed against the live provider catalog so that
/// name, description and price track whatever the shop owner configured on the provider side. A provider
/// outage degrades to the locally stored values rather than failing the page.
pub async fn shop_products<B, G>(
    api: web::Data<ProductApi<B>>,
    gateway: web::Data<G>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
    G: PaymentGateway,
{
    trace!("💻️ GET /products");
    let mut products = api.listed_products().await?;
    let server_ids: Vec<i64> = {
        let mut ids: Vec<i64> = products
            .iter()
            .filter(|p| p.easydonate_product_id.is_some())
            .filter_map(|p| p.easydonate_server_id.or(options.default_server_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    };
    let mut catalogs: HashMap<i64, std::sync::Arc<Vec<RemoteProduct>>> = HashMap::new();
    for server_id in server_ids {
        match gateway.products_for_server(server_id).await {
            Ok(catalog) => {
                catalogs.insert(server_id, catalog);
            },
            Err(e) => warn!("💻️ Could not refresh the catalog for server {server_id}: {e}"),
        }
    }
    for product in &mut products {
        refresh_from_catalog(product, &catalogs, options.default_server_id);
    }
    Ok(HttpResponse::Ok().json(products))
}

fn refresh_from_catalog(
    product: &mut Product,
    catalogs: &HashMap<i64, std::sync::Arc<Vec<RemoteProduct>>>,
    default_server_id: Option<i64>,
) {
    let Some(provider_id) = product.easydonate_product_id.as_deref() else {
        return;
    };
    let Some(server_id) = product.easydonate_server_id.or(default_server_id) else {
        return;
    };
    let Some(remote) = catalogs.get(&server_id).and_then(|c| c.iter().find(|r| r.id == provider_id)) else {
        return;
    };
    if !remote.name.is_empty() {
        product.name = remote.name.clone();
    }
    if !remote.description.is_empty() {
        product.description = remote.description.clone();
    }
    if remote.price.value() > 0 {
        product.price = remote.price;
    }
}

//----------------------------------------------   Admin: orders  ----------------------------------------------
route!(admin_orders => Get "/orders" impl StorefrontBackend);
/// The admin order list, with the aggregate summary for the dashboard header.
///
/// If an expiry window is configured, stale pending orders are swept before the query runs, so the list the
/// admin sees never contains orders that are already past their window.
pub async fn admin_orders<B>(
    api: web::Data<OrderFlowApi<B>>,
    query: web::Query<AdminOrdersQuery>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    trace!("💻️ GET /api/orders");
    sweep_expired_orders(&api, options.order_expiry).await;
    let query = query.into_inner();
    let filter = OrderQueryFilter { status: query.status, query: query.query, ..Default::default() };
    let orders = api.search_orders(&filter).await?;
    let summary = api.order_summary().await?;
    Ok(HttpResponse::Ok().json(OrderListResponse { orders, summary }))
}

/// Run the expiry sweep, logging rather than propagating failures. The order list must still render when the
/// sweep cannot run.
pub async fn sweep_expired_orders<B>(api: &OrderFlowApi<B>, window: Duration)
where B: StorefrontBackend {
    if window <= Duration::zero() {
        return;
    }
    match api.cancel_expired_orders(window).await {
        Ok(cancelled) if !cancelled.is_empty() => {
            info!("🕰️ Expiry sweep cancelled {} stale pending order(s)", cancelled.len())
        },
        Ok(_) => {},
        Err(e) => warn!("🕰️ Expiry sweep failed: {e}"),
    }
}

route!(admin_order_update => Patch "/orders/{id}" impl StorefrontBackend);
/// Manually override an order's status. The payment leg is kept in sync by the backend.
pub async fn admin_order_update<B>(
    path: web::Path<i64>,
    body: web::Json<OrderStatusUpdate>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    let order_id = path.into_inner();
    let new_status = body.into_inner().status;
    debug!("💻️ Admin override: order #{order_id} -> {new_status}");
    let order = api.update_order_status(order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(admin_orders_export => Get "/orders/export" impl StorefrontBackend);
/// The full order list as a semicolon-separated CSV download.
pub async fn admin_orders_export<B>(
    api: web::Data<OrderFlowApi<B>>,
    query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    trace!("💻️ GET /api/orders/export");
    let query = query.into_inner();
    let filter = OrderQueryFilter { status: query.status, query: query.query, ..Default::default() };
    let orders = api.search_orders(&filter).await?;
    let csv = orders_to_csv(&orders);
    Ok(HttpResponse::Ok()
        .insert_header(("Content-Type", "text/csv; charset=utf-8"))
        .insert_header(("Content-Disposition", "attachment; filename=\"orders.csv\""))
        .body(csv))
}

pub fn orders_to_csv(orders: &[OrderWithRelations]) -> String {
    let mut out = String::from("ID;Status;Nickname;Email;Product;Price;Created\n");
    for o in orders {
        let row = format!(
            "{};{};{};{};{};{};{}\n",
            o.order.id,
            o.order.status,
            csv_field(&o.order.nickname),
            csv_field(&o.buyer_email),
            csv_field(&o.product.name),
            o.amount().value(),
            o.order.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
        out.push_str(&row);
    }
    out
}

fn csv_field(value: &str) -> String {
    value.replace([';', '\n', '\r'], " ")
}

//----------------------------------------------   Admin: products  --------------------------------------------
route!(admin_products => Get "/products" impl StorefrontBackend);
/// Every product, hidden and archived included.
pub async fn admin_products<B>(api: web::Data<ProductApi<B>>) -> Result<HttpResponse, ServerError>
where B: StorefrontBackend {
    let products = api.all_products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(admin_product_create => Post "/products" impl StorefrontBackend);
pub async fn admin_product_create<B>(
    body: web::Json<NewProduct>,
    api: web::Data<ProductApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    let product = body.into_inner();
    if product.name.trim().is_empty() {
        return Err(ServerError::ValidationError("A product needs a name.".to_string()));
    }
    if product.price.value() < 0 {
        return Err(ServerError::ValidationError("A product price cannot be negative.".to_string()));
    }
    let product = api.create_product(product).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(admin_product_update => Patch "/products/{id}" impl StorefrontBackend);
pub async fn admin_product_update<B>(
    path: web::Path<i64>,
    body: web::Json<UpdateProductRequest>,
    api: web::Data<ProductApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    let product_id = path.into_inner();
    let update = body.into_inner();
    if update.is_empty() {
        return Err(ServerError::ValidationError("The update request is empty.".to_string()));
    }
    let product = api.update_product(product_id, update).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(admin_product_delete => Delete "/products/{id}" impl StorefrontBackend);
/// Deleting a product takes its orders and their payments along with it.
pub async fn admin_product_delete<B>(
    path: web::Path<i64>,
    api: web::Data<ProductApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    let product_id = path.into_inner();
    let product = api.delete_product(product_id).await?;
    info!("💻️ Admin deleted product #{product_id} ({})", product.name);
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Product {product_id} deleted"))))
}

//----------------------------------------------   Admin: audit  -----------------------------------------------
route!(admin_audit => Get "/audit" impl StorefrontBackend);
pub async fn admin_audit<B>(
    query: web::Query<AuditQuery>,
    api: web::Data<AuditApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    let limit = query.into_inner().limit.unwrap_or_default();
    let entries = api.recent_entries(limit).await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(admin_audit_delete => Delete "/audit/{id}" impl StorefrontBackend);
pub async fn admin_audit_delete<B>(
    path: web::Path<i64>,
    api: web::Data<AuditApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: StorefrontBackend,
{
    let entry_id = path.into_inner();
    if api.delete_entry(entry_id).await? {
        Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Audit entry {entry_id} deleted"))))
    } else {
        Err(ServerError::NoRecordFound(format!("Audit entry {entry_id}")))
    }
}
