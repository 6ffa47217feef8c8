//! Assembles the dealflow runtime from configuration.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use dealflow_core::config::{DealflowConfig, StoreBackend};
use dealflow_core::notify::EmailSender;
use dealflow_core::store::{
    DocumentStore, LeadStore, MemoryStore, PermissionStore, RecordStore, RuleStore, ShareStore,
    TaskStore,
};
use dealflow_core::Result;
use dealflow_runtime::engine::RuleEngine;
use dealflow_runtime::ledger::SharingLedger;
use dealflow_runtime::notify::{HttpEmailSender, Notifier};
use dealflow_runtime::poller::{Poller, PollerConfig, PollerHandle};
use dealflow_runtime::scheduler::Scheduler;
use dealflow_runtime::services::{DataroomService, PipelineService, RulesService};
use dealflow_runtime::store::PgRecordStore;

/// Prelude module for common imports.
pub mod prelude {
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;

    pub use dealflow_core::automation::{AutomationRule, ScheduledTask, TaskStatus};
    pub use dealflow_core::config::DealflowConfig;
    pub use dealflow_core::dataroom::{Document, DocumentPermission, SharedDocument};
    pub use dealflow_core::error::{DealflowError, Result};
    pub use dealflow_core::pipeline::{Lead, Stage};

    pub use crate::{Dealflow, DealflowBuilder};
}

/// The assembled runtime: services, ledger, and scheduler wired over a
/// single record store.
///
/// Build one with [`Dealflow::builder`], then call the service
/// accessors. [`Dealflow::start_poller`] drives deferred work in the
/// background until its handle is shut down.
pub struct Dealflow {
    config: DealflowConfig,
    pipeline: PipelineService,
    dataroom: DataroomService,
    rules: RulesService,
    ledger: SharingLedger,
    scheduler: Scheduler,
    engine: RuleEngine,
}

impl Dealflow {
    /// Create a new builder.
    pub fn builder() -> DealflowBuilder {
        DealflowBuilder::new()
    }

    /// Get the configuration.
    pub fn config(&self) -> &DealflowConfig {
        &self.config
    }

    /// Lead pipeline operations.
    pub fn pipeline(&self) -> &PipelineService {
        &self.pipeline
    }

    /// Document and permission operations.
    pub fn dataroom(&self) -> &DataroomService {
        &self.dataroom
    }

    /// Automation rule operations.
    pub fn rules(&self) -> &RulesService {
        &self.rules
    }

    /// The sharing ledger.
    pub fn ledger(&self) -> &SharingLedger {
        &self.ledger
    }

    /// The task scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start the background poller for one owner's workspace.
    pub fn start_poller(&self, owner_id: Uuid) -> PollerHandle {
        let poller = Poller::new(
            self.scheduler.clone(),
            self.engine.clone(),
            PollerConfig {
                owner_id,
                poll_interval: Duration::from_secs(self.config.automation.poll_interval_secs),
            },
        );
        poller.start()
    }
}

/// Builder for the dealflow runtime.
///
/// The storage backend is chosen once at build time from
/// `config.store.backend`. Injected overrides take precedence; tests use
/// them to swap in in-memory doubles.
pub struct DealflowBuilder {
    config: DealflowConfig,
    store: Option<Arc<dyn RecordStore>>,
    email_sender: Option<Arc<dyn EmailSender>>,
}

impl DealflowBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: DealflowConfig::default(),
            store: None,
            email_sender: None,
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: DealflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific record store instead of the configured backend.
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Use a specific email sender instead of the HTTP one.
    pub fn email_sender(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email_sender = Some(sender);
        self
    }

    /// Build and wire the runtime.
    pub async fn build(self) -> Result<Dealflow> {
        let config = self.config;

        let store: Arc<dyn RecordStore> = match self.store {
            Some(store) => store,
            None => match config.store.backend {
                StoreBackend::Memory => Arc::new(MemoryStore::new()),
                StoreBackend::Postgres => Arc::new(PgRecordStore::connect(&config.store).await?),
            },
        };

        let sender: Arc<dyn EmailSender> = match self.email_sender {
            Some(sender) => sender,
            None => Arc::new(HttpEmailSender::new(&config.email)),
        };

        let leads = LeadStore::new(store.clone());
        let documents = DocumentStore::new(store.clone());
        let permissions = PermissionStore::new(store.clone());
        let rules = RuleStore::new(store.clone());
        let tasks = TaskStore::new(store.clone());
        let ledger = SharingLedger::new(ShareStore::new(store), leads.clone());
        let scheduler = Scheduler::new(tasks, leads.clone(), rules.clone());
        let notifier = Notifier::new(sender, config.email.clone());

        let engine = RuleEngine::new(
            rules.clone(),
            documents.clone(),
            permissions.clone(),
            leads.clone(),
            ledger.clone(),
            scheduler.clone(),
            notifier,
            config.automation.portal_base_url.clone(),
        );

        tracing::info!(backend = ?config.store.backend, "Dealflow runtime assembled");

        Ok(Dealflow {
            pipeline: PipelineService::new(leads, engine.clone()),
            dataroom: DataroomService::new(documents, permissions, ledger.clone()),
            rules: RulesService::new(rules),
            ledger,
            scheduler,
            engine,
            config,
        })
    }
}

impl Default for DealflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealflow_core::automation::AutomationRule;
    use dealflow_core::pipeline::Stage;
    use dealflow_core::testing::{document, MockEmailSender};

    async fn build_with_mocks(sender: MockEmailSender) -> Dealflow {
        Dealflow::builder()
            .store(Arc::new(MemoryStore::new()))
            .email_sender(Arc::new(sender))
            .build()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_defaults_to_memory_store() {
        let app = Dealflow::builder().build().await.unwrap();
        assert_eq!(app.config().store.backend, StoreBackend::Memory);

        let lead = app
            .pipeline()
            .create_lead(Uuid::new_v4(), "Jordan Reyes", "jordan@nexus.example", "Nexus")
            .await
            .unwrap();
        assert_eq!(lead.stage, Stage::Target);
    }

    #[tokio::test]
    async fn test_stage_move_shares_and_emails_through_facade() {
        let sender = MockEmailSender::new();
        let app = build_with_mocks(sender.clone()).await;
        let owner_id = Uuid::new_v4();

        let lead = app
            .pipeline()
            .create_lead(owner_id, "Jordan Reyes", "jordan@nexus.example", "Nexus")
            .await
            .unwrap();
        let document = app
            .dataroom()
            .save_document(document(owner_id, "Pitch Deck"))
            .await
            .unwrap();
        app.rules()
            .save_rule(
                AutomationRule::new(owner_id, "Send deck", Stage::PitchShared)
                    .with_documents(vec![document.id])
                    .with_email("Deck for {{firm}}", "Hi {{name}}, the deck is attached."),
            )
            .await
            .unwrap();

        app.pipeline()
            .move_stage(lead.id, Stage::PitchShared)
            .await
            .unwrap();

        let shares = app.ledger().shares_for_lead(lead.id).await.unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].document_id, document.id);

        sender.assert_sent_count(1);
        let sent = sender.sent();
        assert_eq!(sent[0].to, "jordan@nexus.example");
        assert_eq!(sent[0].subject, "Deck for Nexus");
    }

    #[tokio::test]
    async fn test_poller_handle_stops_cleanly() {
        let app = build_with_mocks(MockEmailSender::new()).await;
        let handle = app.start_poller(Uuid::new_v4());
        assert!(handle.is_running());
        handle.shutdown().await;
    }
}
