use std::sync::Arc;

use chrono::{DateTime, Utc};
use donate_engine::{
    db_types::{
        AuditEntry,
        Buyer,
        Coupon,
        NewAuditEntry,
        NewCoupon,
        NewOrder,
        NewPayment,
        NewProduct,
        Order,
        OrderStatusType,
        OwnedPrivilege,
        Payment,
        PaymentWithOrder,
        Product,
        UpdateProductRequest,
    },
    order_objects::{OrderQueryFilter, OrderSummary, OrderWithRelations},
    traits::{AuditLogging, OrderManagement, ProductManagement, StorefrontDatabase, StorefrontDbError},
};
use dpg_common::Rubles;
use easydonate_tools::{
    CreatePaymentRequest,
    EasyDonateApiError,
    PaymentGateway,
    PaymentSession,
    RemoteProduct,
    SurchargeQuote,
};
use mockall::mock;

mock! {
    pub Backend {}

    impl Clone for Backend {
        fn clone(&self) -> Self;
    }

    impl StorefrontDatabase for Backend {
        fn url(&self) -> &str;
        async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, StorefrontDbError>;
        async fn fetch_or_create_buyer(&self, email: &str, credential: &str) -> Result<Buyer, StorefrontDbError>;
        async fn completed_privileges_for(&self, nickname: &str) -> Result<Vec<OwnedPrivilege>, StorefrontDbError>;
        async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, StorefrontDbError>;
        async fn insert_order_with_payment(
            &self,
            order: NewOrder,
            payment: NewPayment,
        ) -> Result<(Order, Payment), StorefrontDbError>;
        async fn fetch_payment_by_external_id(
            &self,
            external_id: &str,
        ) -> Result<Option<PaymentWithOrder>, StorefrontDbError>;
        async fn mark_payment_received(
            &self,
            payment_id: i64,
            amount: Rubles,
        ) -> Result<PaymentWithOrder, StorefrontDbError>;
        async fn redeem_coupon(&self, coupon_id: i64) -> Result<bool, StorefrontDbError>;
        async fn thank_you_coupon_exists(&self, order_id: i64) -> Result<bool, StorefrontDbError>;
        async fn insert_coupon(&self, coupon: NewCoupon) -> Result<Coupon, StorefrontDbError>;
        async fn cancel_orders_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, StorefrontDbError>;
    }

    impl OrderManagement for Backend {
        async fn fetch_order_with_relations(
            &self,
            order_id: i64,
        ) -> Result<Option<OrderWithRelations>, StorefrontDbError>;
        async fn search_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<OrderWithRelations>, StorefrontDbError>;
        async fn order_summary(&self) -> Result<OrderSummary, StorefrontDbError>;
        async fn set_order_status(
            &self,
            order_id: i64,
            status: OrderStatusType,
        ) -> Result<OrderWithRelations, StorefrontDbError>;
    }

    impl ProductManagement for Backend {
        async fn all_products(&self) -> Result<Vec<Product>, StorefrontDbError>;
        async fn listed_products(&self) -> Result<Vec<Product>, StorefrontDbError>;
        async fn insert_product(&self, product: NewProduct) -> Result<Product, StorefrontDbError>;
        async fn update_product(
            &self,
            product_id: i64,
            update: UpdateProductRequest,
        ) -> Result<Product, StorefrontDbError>;
        async fn delete_product(&self, product_id: i64) -> Result<Product, StorefrontDbError>;
    }

    impl AuditLogging for Backend {
        async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, StorefrontDbError>;
        async fn fetch_audit_entries(&self, limit: i64) -> Result<Vec<AuditEntry>, StorefrontDbError>;
        async fn delete_audit_entry(&self, entry_id: i64) -> Result<bool, StorefrontDbError>;
    }
}

mock! {
    pub Gateway {}

    impl PaymentGateway for Gateway {
        async fn products_for_server(&self, server_id: i64) -> Result<Arc<Vec<RemoteProduct>>, EasyDonateApiError>;
        async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<PaymentSession, EasyDonateApiError>;
        async fn surcharge_for(
            &self,
            nickname: &str,
            product_id: &str,
            server_id: Option<i64>,
        ) -> Option<SurchargeQuote>;
    }
}
