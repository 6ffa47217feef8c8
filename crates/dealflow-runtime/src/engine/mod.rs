//! Stage-triggered rule evaluation and permission sweeps.

mod permissions;

use chrono::{Duration, Utc};

use dealflow_core::automation::AutomationRule;
use dealflow_core::pipeline::{Lead, Stage};
use dealflow_core::store::{DocumentStore, LeadStore, PermissionStore, RuleStore};
use dealflow_core::{template, DealflowError, Result};

use crate::ledger::SharingLedger;
use crate::notify::Notifier;
use crate::scheduler::Scheduler;

/// Runs automation when leads enter pipeline stages.
///
/// Split into a *decide* path ([`execute_rule`]) and a *perform* path
/// ([`perform_rule`]): once a delayed rule has been deferred, execution
/// lands directly on the perform path and the delay is never consulted
/// again, so a deferral can't re-arm itself.
///
/// [`execute_rule`]: RuleEngine::execute_rule
/// [`perform_rule`]: RuleEngine::perform_rule
#[derive(Clone)]
pub struct RuleEngine {
    rules: RuleStore,
    documents: DocumentStore,
    permissions: PermissionStore,
    leads: LeadStore,
    ledger: SharingLedger,
    scheduler: Scheduler,
    notifier: Notifier,
    portal_base_url: Option<String>,
}

impl RuleEngine {
    /// Wire an engine over its stores and collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: RuleStore,
        documents: DocumentStore,
        permissions: PermissionStore,
        leads: LeadStore,
        ledger: SharingLedger,
        scheduler: Scheduler,
        notifier: Notifier,
        portal_base_url: Option<String>,
    ) -> Self {
        Self {
            rules,
            documents,
            permissions,
            leads,
            ledger,
            scheduler,
            notifier,
            portal_base_url,
        }
    }

    /// React to a lead entering `new_stage`.
    ///
    /// Loads the owner's active rules with a matching trigger stage and
    /// runs each independently; one rule's failure never stops the others.
    /// The old stage is logged only; re-entering a stage re-fires its
    /// rules. Finishes with the permission sweep for this lead. Automation
    /// failures are logged, never surfaced: a stage move must not fail
    /// because automation did.
    pub async fn on_stage_change(&self, lead: &Lead, old_stage: Stage, new_stage: Stage) {
        let rules = match self.rules.active_for_stage(lead.owner_id, new_stage).await {
            Ok(rules) => rules,
            Err(e) => {
                tracing::error!(
                    lead_id = %lead.id,
                    error = %e,
                    "Failed to load rules for stage change"
                );
                Vec::new()
            }
        };

        if rules.is_empty() {
            tracing::debug!(
                lead_id = %lead.id,
                from = %old_stage,
                to = %new_stage,
                "No active rules for stage"
            );
        } else {
            tracing::info!(
                lead_id = %lead.id,
                from = %old_stage,
                to = %new_stage,
                rules = rules.len(),
                "Running stage automation"
            );
            for rule in &rules {
                if let Err(e) = self.execute_rule(lead, rule).await {
                    tracing::error!(
                        rule_id = %rule.id,
                        rule_name = %rule.name,
                        lead_id = %lead.id,
                        error = %e,
                        "Rule execution failed"
                    );
                }
            }
        }

        self.apply_permissions(lead).await;
    }

    /// Decide whether a rule acts now or later.
    ///
    /// A positive `delay_days` materializes a scheduled task and returns
    /// without sharing; everything else runs immediately.
    pub async fn execute_rule(&self, lead: &Lead, rule: &AutomationRule) -> Result<()> {
        if rule.delay_days > 0 {
            let scheduled_at = Utc::now()
                .checked_add_signed(Duration::days(rule.delay_days as i64))
                .ok_or_else(|| {
                    DealflowError::Validation(format!(
                        "Rule delay of {} days is out of range",
                        rule.delay_days
                    ))
                })?;
            self.scheduler
                .create_task(lead.owner_id, lead.id, rule.id, scheduled_at)
                .await?;
            return Ok(());
        }
        self.perform_rule(lead, rule).await
    }

    /// Run a rule's action now, delay already elapsed.
    ///
    /// Resolves the rule's documents (missing ids are logged and skipped),
    /// shares each through the ledger in list order, then sends the rule
    /// email if the gate is open. A notifier failure is logged and never
    /// unwinds the completed shares.
    pub async fn perform_rule(&self, lead: &Lead, rule: &AutomationRule) -> Result<()> {
        let mut resolved = Vec::new();
        let mut newly_shared = 0usize;

        for document_id in &rule.document_ids {
            let document = match self.documents.get(*document_id).await? {
                Some(document) => document,
                None => {
                    tracing::warn!(
                        rule_id = %rule.id,
                        document_id = %document_id,
                        "Rule references missing document, skipping"
                    );
                    continue;
                }
            };
            let (_, created) = self.ledger.share_document(lead.id, document.id).await?;
            if created {
                newly_shared += 1;
            }
            resolved.push(document);
        }

        if !rule.has_email() {
            return Ok(());
        }

        // Email gate: documentless rules notify on every firing; rules
        // with documents notify only when something was newly shared.
        if !rule.document_ids.is_empty() && newly_shared == 0 {
            tracing::debug!(
                rule_id = %rule.id,
                lead_id = %lead.id,
                "Nothing newly shared, suppressing rule email"
            );
            return Ok(());
        }

        let subject = template::render(&rule.email_subject, lead);
        let body = template::render(&rule.email_body, lead);
        if let Err(e) = self
            .notifier
            .send_document_email(lead, subject, body, &resolved, self.portal_url_for(lead))
            .await
        {
            tracing::error!(
                rule_id = %rule.id,
                lead_id = %lead.id,
                error = %e,
                "Rule email failed, shares are kept"
            );
        }
        Ok(())
    }

    fn portal_url_for(&self, lead: &Lead) -> Option<String> {
        self.portal_base_url
            .as_ref()
            .map(|base| format!("{}/portal/{}", base.trim_end_matches('/'), lead.id))
    }
}
