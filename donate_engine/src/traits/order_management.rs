use crate::{
    db_types::OrderStatusType,
    order_objects::{OrderQueryFilter, OrderSummary, OrderWithRelations},
    traits::StorefrontDbError,
};

/// Admin-facing order queries and manual overrides. The core pipeline never calls these.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_order_with_relations(
        &self,
        order_id: i64,
    ) -> Result<Option<OrderWithRelations>, StorefrontDbError>;

    /// Orders matching the filter, newest first, joined to product, payment and buyer.
    async fn search_orders(&self, filter: &OrderQueryFilter) -> Result<Vec<OrderWithRelations>, StorefrontDbError>;

    async fn order_summary(&self) -> Result<OrderSummary, StorefrontDbError>;

    /// Force the order into the given status, adjusting the payment leg to match (`Completed` ⇒ payment
    /// `Received`, `Failed`/`Cancelled` ⇒ `Cancelled`, `Pending` ⇒ `Pending`). Admin override; the caller is
    /// responsible for the audit entry.
    async fn set_order_status(
        &self,
        order_id: i64,
        status: OrderStatusType,
    ) -> Result<OrderWithRelations, StorefrontDbError>;
}
