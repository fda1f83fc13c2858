use std::fmt::Debug;

use crate::{
    api::errors::OrderFlowError,
    db_types::{AuditEntry, NewAuditEntry},
    traits::AuditLogging,
};

pub const DEFAULT_AUDIT_PAGE: i64 = 100;

/// Read and prune access to the audit trail for the admin surface.
pub struct AuditApi<B> {
    db: B,
}

impl<B> Debug for AuditApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AuditApi")
    }
}

impl<B: Clone> Clone for AuditApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> AuditApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AuditApi<B>
where B: AuditLogging
{
    pub async fn record(&self, entry: NewAuditEntry) -> Result<AuditEntry, OrderFlowError> {
        Ok(self.db.insert_audit_entry(entry).await?)
    }

    /// The most recent entries, newest first. A non-positive limit falls back to [`DEFAULT_AUDIT_PAGE`].
    pub async fn recent_entries(&self, limit: i64) -> Result<Vec<AuditEntry>, OrderFlowError> {
        let limit = if limit > 0 { limit } else { DEFAULT_AUDIT_PAGE };
        Ok(self.db.fetch_audit_entries(limit).await?)
    }

    /// Returns false if no entry with that id existed.
    pub async fn delete_entry(&self, entry_id: i64) -> Result<bool, OrderFlowError> {
        Ok(self.db.delete_audit_entry(entry_id).await?)
    }
}
