use crate::{
    db_types::{AuditEntry, NewAuditEntry},
    traits::StorefrontDbError,
};

/// The append-only audit trail. The pipeline writes; the admin surface reads and prunes.
#[allow(async_fn_in_trait)]
pub trait AuditLogging: Clone {
    async fn insert_audit_entry(&self, entry: NewAuditEntry) -> Result<AuditEntry, StorefrontDbError>;

    /// The most recent entries, newest first.
    async fn fetch_audit_entries(&self, limit: i64) -> Result<Vec<AuditEntry>, StorefrontDbError>;

    /// Returns false if no entry with that id existed.
    async fn delete_audit_entry(&self, entry_id: i64) -> Result<bool, StorefrontDbError>;
}
