//! Shared wiring for this crate's tests: an in-memory store, a mock
//! email sender, and all the runtime pieces connected the way the
//! facade connects them.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use dealflow_core::automation::{AutomationRule, ScheduledTask};
use dealflow_core::config::EmailConfig;
use dealflow_core::dataroom::{Document, DocumentPermission};
use dealflow_core::pipeline::{Lead, Stage};
use dealflow_core::store::{
    DocumentStore, LeadStore, MemoryStore, PermissionStore, RecordStore, RuleStore, ShareStore,
    TaskStore,
};
use dealflow_core::testing::{document, lead_in_stage, rule_for_stage, MockEmailSender};

use crate::engine::RuleEngine;
use crate::ledger::SharingLedger;
use crate::notify::Notifier;
use crate::poller::{Poller, PollerConfig};
use crate::scheduler::Scheduler;

pub struct TestRig {
    pub owner_id: Uuid,
    pub leads: LeadStore,
    pub documents: DocumentStore,
    pub permissions: PermissionStore,
    pub rules: RuleStore,
    pub tasks: TaskStore,
    pub ledger: SharingLedger,
    pub scheduler: Scheduler,
    pub sender: MockEmailSender,
    pub engine: RuleEngine,
}

impl TestRig {
    pub fn new() -> Self {
        Self::build(None)
    }

    pub fn with_portal(base: &str) -> Self {
        Self::build(Some(base.to_string()))
    }

    fn build(portal_base_url: Option<String>) -> Self {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
        let leads = LeadStore::new(store.clone());
        let documents = DocumentStore::new(store.clone());
        let permissions = PermissionStore::new(store.clone());
        let rules = RuleStore::new(store.clone());
        let tasks = TaskStore::new(store.clone());
        let ledger = SharingLedger::new(ShareStore::new(store), leads.clone());
        let scheduler = Scheduler::new(tasks.clone(), leads.clone(), rules.clone());

        let sender = MockEmailSender::new();
        // Tiny backoffs keep retry tests fast.
        let notifier = Notifier::new(
            Arc::new(sender.clone()),
            EmailConfig {
                retry_base_ms: 1,
                retry_cap_ms: 2,
                ..Default::default()
            },
        );

        let engine = RuleEngine::new(
            rules.clone(),
            documents.clone(),
            permissions.clone(),
            leads.clone(),
            ledger.clone(),
            scheduler.clone(),
            notifier,
            portal_base_url,
        );

        Self {
            owner_id: Uuid::new_v4(),
            leads,
            documents,
            permissions,
            rules,
            tasks,
            ledger,
            scheduler,
            sender,
            engine,
        }
    }

    pub async fn seed_lead(&self, stage: Stage) -> Lead {
        let lead = lead_in_stage(self.owner_id, stage);
        self.leads.put(&lead).await.unwrap();
        lead
    }

    pub async fn seed_document(&self, name: &str) -> Document {
        let doc = document(self.owner_id, name);
        self.documents.put(&doc).await.unwrap();
        doc
    }

    pub async fn seed_rule(&self, stage: Stage, document_ids: Vec<Uuid>) -> AutomationRule {
        let rule = rule_for_stage(self.owner_id, stage, document_ids);
        self.rules.put(&rule).await.unwrap();
        rule
    }

    pub async fn seed_permission(
        &self,
        document_id: Uuid,
        stage: Stage,
        delay_days: u32,
    ) -> DocumentPermission {
        let permission = DocumentPermission::new(self.owner_id, document_id, stage)
            .with_delay_days(delay_days);
        self.permissions.put(&permission).await.unwrap();
        permission
    }

    pub async fn task(&self, id: Uuid) -> ScheduledTask {
        self.tasks.require(id).await.unwrap()
    }

    pub fn poller(&self) -> Poller {
        Poller::new(
            self.scheduler.clone(),
            self.engine.clone(),
            PollerConfig {
                owner_id: self.owner_id,
                poll_interval: Duration::from_millis(20),
            },
        )
    }
}
