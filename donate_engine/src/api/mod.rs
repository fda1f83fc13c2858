//! The engine's public API layer. Thin service objects over the backend traits that add the cross-cutting
//! behaviour the raw backends do not carry: audit-trail writes, coupon policy and thank-you coupon issuance.

pub mod audit_api;
pub mod errors;
pub mod order_flow_api;
pub mod product_api;
