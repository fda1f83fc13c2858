//! Database management and control.
//!
//! This module defines the interface contracts that storefront database *backends* must satisfy. A SQLite
//! implementation ships with the crate; the server's endpoint tests substitute mocks.
//!
//! * [`StorefrontDatabase`] carries the core pipeline: checkout persistence, webhook reconciliation and the
//!   expiry sweep.
//! * [`OrderManagement`] provides the admin-facing order queries and manual status overrides.
//! * [`ProductManagement`] provides the product catalog CRUD.
//! * [`AuditLogging`] provides the append-only audit trail.

mod audit_logging;
mod order_management;
mod product_management;
mod storefront_database;

pub use audit_logging::AuditLogging;
pub use order_management::OrderManagement;
pub use product_management::ProductManagement;
pub use storefront_database::{StorefrontDatabase, StorefrontDbError};

/// The full set of backend behaviour. Route handlers are generic over this so that endpoint tests can swap in
/// a mock backend.
pub trait StorefrontBackend: StorefrontDatabase + OrderManagement + ProductManagement + AuditLogging {}

impl<T> StorefrontBackend for T where T: StorefrontDatabase + OrderManagement + ProductManagement + AuditLogging {}
