use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::automation::{AutomationRule, ScheduledTask, TaskStatus};
use crate::dataroom::{Document, DocumentPermission, SharedDocument};
use crate::error::{DealflowError, Result};
use crate::pipeline::{Lead, Stage};
use crate::store::{
    Filter, RecordStore, AUTOMATION_RULES, DOCUMENTS, DOCUMENT_PERMISSIONS, LEADS,
    SCHEDULED_TASKS, SHARED_DOCUMENTS,
};

fn decode_opt<T: DeserializeOwned>(value: Option<Value>) -> Result<Option<T>> {
    value
        .map(serde_json::from_value)
        .transpose()
        .map_err(Into::into)
}

fn decode_all<T: DeserializeOwned>(values: Vec<Value>) -> Result<Vec<T>> {
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(Into::into))
        .collect()
}

/// Typed access to lead records.
#[derive(Clone)]
pub struct LeadStore {
    store: Arc<dyn RecordStore>,
}

impl LeadStore {
    /// Wrap a raw record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch a lead by ID.
    pub async fn get(&self, id: Uuid) -> Result<Option<Lead>> {
        decode_opt(self.store.get(LEADS, id).await?)
    }

    /// Fetch a lead, erroring when absent.
    pub async fn require(&self, id: Uuid) -> Result<Lead> {
        self.get(id)
            .await?
            .ok_or_else(|| DealflowError::NotFound(format!("Lead {}", id)))
    }

    /// Insert or replace a lead.
    pub async fn put(&self, lead: &Lead) -> Result<()> {
        self.store
            .set(LEADS, lead.id, serde_json::to_value(lead)?)
            .await
    }

    /// All leads belonging to `owner_id`.
    pub async fn for_owner(&self, owner_id: Uuid) -> Result<Vec<Lead>> {
        decode_all(
            self.store
                .query(LEADS, &[Filter::eq("owner_id", owner_id)])
                .await?,
        )
    }

    /// Delete a lead.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete(LEADS, id).await
    }
}

/// Typed access to document records.
#[derive(Clone)]
pub struct DocumentStore {
    store: Arc<dyn RecordStore>,
}

impl DocumentStore {
    /// Wrap a raw record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch a document by ID.
    pub async fn get(&self, id: Uuid) -> Result<Option<Document>> {
        decode_opt(self.store.get(DOCUMENTS, id).await?)
    }

    /// Fetch a document, erroring when absent.
    pub async fn require(&self, id: Uuid) -> Result<Document> {
        self.get(id)
            .await?
            .ok_or_else(|| DealflowError::NotFound(format!("Document {}", id)))
    }

    /// Insert or replace a document.
    pub async fn put(&self, document: &Document) -> Result<()> {
        self.store
            .set(DOCUMENTS, document.id, serde_json::to_value(document)?)
            .await
    }

    /// All documents belonging to `owner_id`.
    pub async fn for_owner(&self, owner_id: Uuid) -> Result<Vec<Document>> {
        decode_all(
            self.store
                .query(DOCUMENTS, &[Filter::eq("owner_id", owner_id)])
                .await?,
        )
    }

    /// Delete a document.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete(DOCUMENTS, id).await
    }
}

/// Typed access to document permission records.
#[derive(Clone)]
pub struct PermissionStore {
    store: Arc<dyn RecordStore>,
}

impl PermissionStore {
    /// Wrap a raw record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch a permission by ID.
    pub async fn get(&self, id: Uuid) -> Result<Option<DocumentPermission>> {
        decode_opt(self.store.get(DOCUMENT_PERMISSIONS, id).await?)
    }

    /// Insert or replace a permission.
    pub async fn put(&self, permission: &DocumentPermission) -> Result<()> {
        self.store
            .set(
                DOCUMENT_PERMISSIONS,
                permission.id,
                serde_json::to_value(permission)?,
            )
            .await
    }

    /// All permissions belonging to `owner_id`.
    pub async fn for_owner(&self, owner_id: Uuid) -> Result<Vec<DocumentPermission>> {
        decode_all(
            self.store
                .query(DOCUMENT_PERMISSIONS, &[Filter::eq("owner_id", owner_id)])
                .await?,
        )
    }

    /// All permissions attached to a document.
    pub async fn for_document(&self, document_id: Uuid) -> Result<Vec<DocumentPermission>> {
        decode_all(
            self.store
                .query(
                    DOCUMENT_PERMISSIONS,
                    &[Filter::eq("document_id", document_id)],
                )
                .await?,
        )
    }

    /// The permission for a `(document, stage)` pair, if one exists.
    pub async fn find(
        &self,
        document_id: Uuid,
        stage: Stage,
    ) -> Result<Option<DocumentPermission>> {
        let mut hits: Vec<DocumentPermission> = decode_all(
            self.store
                .query(
                    DOCUMENT_PERMISSIONS,
                    &[
                        Filter::eq("document_id", document_id),
                        Filter::eq("required_stage", stage),
                    ],
                )
                .await?,
        )?;
        Ok(hits.pop())
    }

    /// Delete a permission.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete(DOCUMENT_PERMISSIONS, id).await
    }
}

/// Typed access to automation rule records.
#[derive(Clone)]
pub struct RuleStore {
    store: Arc<dyn RecordStore>,
}

impl RuleStore {
    /// Wrap a raw record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch a rule by ID.
    pub async fn get(&self, id: Uuid) -> Result<Option<AutomationRule>> {
        decode_opt(self.store.get(AUTOMATION_RULES, id).await?)
    }

    /// Fetch a rule, erroring when absent.
    pub async fn require(&self, id: Uuid) -> Result<AutomationRule> {
        self.get(id)
            .await?
            .ok_or_else(|| DealflowError::NotFound(format!("Rule {}", id)))
    }

    /// Insert or replace a rule.
    pub async fn put(&self, rule: &AutomationRule) -> Result<()> {
        self.store
            .set(AUTOMATION_RULES, rule.id, serde_json::to_value(rule)?)
            .await
    }

    /// All rules belonging to `owner_id`.
    pub async fn for_owner(&self, owner_id: Uuid) -> Result<Vec<AutomationRule>> {
        decode_all(
            self.store
                .query(AUTOMATION_RULES, &[Filter::eq("owner_id", owner_id)])
                .await?,
        )
    }

    /// Active rules for an owner that fire on `stage`.
    pub async fn active_for_stage(
        &self,
        owner_id: Uuid,
        stage: Stage,
    ) -> Result<Vec<AutomationRule>> {
        decode_all(
            self.store
                .query(
                    AUTOMATION_RULES,
                    &[
                        Filter::eq("owner_id", owner_id),
                        Filter::eq("trigger_stage", stage),
                        Filter::eq("is_active", true),
                    ],
                )
                .await?,
        )
    }

    /// Delete a rule.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete(AUTOMATION_RULES, id).await
    }
}

/// Typed access to the sharing ledger.
#[derive(Clone)]
pub struct ShareStore {
    store: Arc<dyn RecordStore>,
}

impl ShareStore {
    /// Wrap a raw record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch a ledger entry by ID.
    pub async fn get(&self, id: Uuid) -> Result<Option<SharedDocument>> {
        decode_opt(self.store.get(SHARED_DOCUMENTS, id).await?)
    }

    /// Insert or replace a ledger entry.
    pub async fn put(&self, share: &SharedDocument) -> Result<()> {
        self.store
            .set(SHARED_DOCUMENTS, share.id, serde_json::to_value(share)?)
            .await
    }

    /// The ledger entry for a `(lead, document)` pair, if one exists.
    pub async fn find_pair(
        &self,
        lead_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<SharedDocument>> {
        let mut hits: Vec<SharedDocument> = decode_all(
            self.store
                .query(
                    SHARED_DOCUMENTS,
                    &[
                        Filter::eq("lead_id", lead_id),
                        Filter::eq("document_id", document_id),
                    ],
                )
                .await?,
        )?;
        Ok(hits.pop())
    }

    /// Everything shared with a lead.
    pub async fn for_lead(&self, lead_id: Uuid) -> Result<Vec<SharedDocument>> {
        decode_all(
            self.store
                .query(SHARED_DOCUMENTS, &[Filter::eq("lead_id", lead_id)])
                .await?,
        )
    }

    /// Every lead a document was shared with.
    pub async fn for_document(&self, document_id: Uuid) -> Result<Vec<SharedDocument>> {
        decode_all(
            self.store
                .query(SHARED_DOCUMENTS, &[Filter::eq("document_id", document_id)])
                .await?,
        )
    }
}

/// Typed access to scheduled task records, including the claim protocol.
#[derive(Clone)]
pub struct TaskStore {
    store: Arc<dyn RecordStore>,
}

impl TaskStore {
    /// Wrap a raw record store.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch a task by ID.
    pub async fn get(&self, id: Uuid) -> Result<Option<ScheduledTask>> {
        decode_opt(self.store.get(SCHEDULED_TASKS, id).await?)
    }

    /// Fetch a task, erroring when absent.
    pub async fn require(&self, id: Uuid) -> Result<ScheduledTask> {
        self.get(id)
            .await?
            .ok_or_else(|| DealflowError::NotFound(format!("Task {}", id)))
    }

    /// Insert or replace a task.
    pub async fn put(&self, task: &ScheduledTask) -> Result<()> {
        self.store
            .set(SCHEDULED_TASKS, task.id, serde_json::to_value(task)?)
            .await
    }

    /// All tasks belonging to `owner_id`.
    pub async fn for_owner(&self, owner_id: Uuid) -> Result<Vec<ScheduledTask>> {
        decode_all(
            self.store
                .query(SCHEDULED_TASKS, &[Filter::eq("owner_id", owner_id)])
                .await?,
        )
    }

    /// Pending tasks whose scheduled time has arrived.
    pub async fn due(&self, owner_id: Uuid, now: DateTime<Utc>) -> Result<Vec<ScheduledTask>> {
        decode_all(
            self.store
                .query(
                    SCHEDULED_TASKS,
                    &[
                        Filter::eq("owner_id", owner_id),
                        Filter::eq("status", TaskStatus::Pending),
                        Filter::at_or_before("scheduled_at", now),
                    ],
                )
                .await?,
        )
    }

    /// Atomically move a pending task to executing. Returns `false` when
    /// another worker already claimed it (or it no longer exists).
    pub async fn claim(&self, id: Uuid) -> Result<bool> {
        self.store
            .update_where(
                SCHEDULED_TASKS,
                id,
                &[Filter::eq("status", TaskStatus::Pending)],
                json!({"status": TaskStatus::Executing}),
            )
            .await
    }

    /// Move an executing task to completed.
    pub async fn complete(&self, id: Uuid) -> Result<()> {
        self.finish(id, TaskStatus::Completed, None).await
    }

    /// Move an executing task to failed, recording the error.
    pub async fn fail(&self, id: Uuid, error: &str) -> Result<()> {
        self.finish(id, TaskStatus::Failed, Some(error)).await
    }

    async fn finish(&self, id: Uuid, status: TaskStatus, error: Option<&str>) -> Result<()> {
        let applied = self
            .store
            .update_where(
                SCHEDULED_TASKS,
                id,
                &[Filter::eq("status", TaskStatus::Executing)],
                json!({
                    "status": status,
                    "executed_at": Utc::now(),
                    "error": error,
                }),
            )
            .await?;
        if applied {
            return Ok(());
        }
        let from = match self.get(id).await? {
            Some(task) => task.status.as_str().to_string(),
            None => "missing".to_string(),
        };
        Err(DealflowError::InvalidTransition {
            from,
            to: status.as_str().to_string(),
        })
    }

    /// Delete a task.
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.store.delete(SCHEDULED_TASKS, id).await
    }
}
