//! Record storage: a small document-store abstraction with an in-memory
//! backend and typed per-entity wrappers.

mod filter;
mod memory;
mod typed;

pub use filter::{Filter, FilterOp};
pub use memory::MemoryStore;
pub use typed::{
    DocumentStore, LeadStore, PermissionStore, RuleStore, ShareStore, TaskStore,
};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// Collection holding [`crate::pipeline::Lead`] records.
pub const LEADS: &str = "leads";
/// Collection holding [`crate::dataroom::Document`] records.
pub const DOCUMENTS: &str = "documents";
/// Collection holding [`crate::dataroom::DocumentPermission`] records.
pub const DOCUMENT_PERMISSIONS: &str = "document_permissions";
/// Collection holding [`crate::dataroom::SharedDocument`] records.
pub const SHARED_DOCUMENTS: &str = "shared_documents";
/// Collection holding [`crate::automation::AutomationRule`] records.
pub const AUTOMATION_RULES: &str = "automation_rules";
/// Collection holding [`crate::automation::ScheduledTask`] records.
pub const SCHEDULED_TASKS: &str = "scheduled_tasks";

/// Storage backend for JSON records keyed by collection and ID.
///
/// Implementations must make `update_where` atomic with respect to other
/// writers of the same record; the scheduler relies on it to claim each
/// task exactly once.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch a record by ID, or `None` when absent.
    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<Value>>;

    /// All records matching every filter. Order is unspecified.
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Value>>;

    /// Insert or fully replace a record.
    async fn set(&self, collection: &str, id: Uuid, record: Value) -> Result<()>;

    /// Shallow-merge `patch` into an existing record. Errors with
    /// `NotFound` when the record is absent.
    async fn update(&self, collection: &str, id: Uuid, patch: Value) -> Result<()>;

    /// Shallow-merge `patch` into the record only if every `guard` filter
    /// matches its current state. The check and the write are atomic.
    /// Returns whether the patch was applied; an absent record yields
    /// `false`, not an error.
    async fn update_where(
        &self,
        collection: &str,
        id: Uuid,
        guard: &[Filter],
        patch: Value,
    ) -> Result<bool>;

    /// Delete a record. Deleting an absent record is a no-op.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<()>;
}
