//! Donation storefront engine
//!
//! This library contains the core logic for the storefront's order and payment pipeline. It is split into:
//! 1. Database management and control ([`mod@sqlite`]). You should never need to touch the database directly;
//!    use the public API instead. The exception is the data types, which live in [`db_types`] and are public.
//! 2. The engine public API ([`mod@api`]): order flow (checkout persistence, webhook reconciliation, expiry
//!    sweeping), product catalog management, and the audit trail. Backends implement the traits in [`traits`]
//!    to power these APIs; a SQLite implementation ships with the crate.
//!
//! The pure business rules — the pricing arithmetic and the privilege tier policy — live in [`pricing`] and
//! [`tier`] respectively and have no I/O dependencies at all.

mod api;
pub mod db_types;
pub mod order_objects;
pub mod pricing;
mod sqlite;
pub mod tier;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    audit_api::AuditApi,
    errors::{CouponRejection, OrderFlowError},
    order_flow_api::{CheckoutDiscounts, CheckoutRecord, FinalizeOutcome, OrderFlowApi},
    product_api::ProductApi,
};
pub use sqlite::SqliteDatabase;
