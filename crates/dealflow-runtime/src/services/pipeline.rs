use chrono::Utc;
use uuid::Uuid;

use dealflow_core::pipeline::{Lead, Stage};
use dealflow_core::store::LeadStore;
use dealflow_core::{DealflowError, Result};

use crate::engine::RuleEngine;

/// Lead CRUD and the stage-move entry point for automation.
#[derive(Clone)]
pub struct PipelineService {
    leads: LeadStore,
    engine: RuleEngine,
}

impl PipelineService {
    /// Create the service over its store and engine.
    pub fn new(leads: LeadStore, engine: RuleEngine) -> Self {
        Self { leads, engine }
    }

    /// Create a lead in the initial `target` stage.
    pub async fn create_lead(
        &self,
        owner_id: Uuid,
        name: impl Into<String>,
        email: impl Into<String>,
        firm: impl Into<String>,
    ) -> Result<Lead> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DealflowError::Validation(
                "Lead name cannot be empty".to_string(),
            ));
        }

        let lead = Lead::new(owner_id, name, email, firm);
        self.leads.put(&lead).await?;
        tracing::info!(lead_id = %lead.id, owner_id = %owner_id, "Created lead");
        Ok(lead)
    }

    /// Fetch one lead.
    pub async fn get_lead(&self, lead_id: Uuid) -> Result<Lead> {
        self.leads.require(lead_id).await
    }

    /// All leads for an owner.
    pub async fn list_leads(&self, owner_id: Uuid) -> Result<Vec<Lead>> {
        self.leads.for_owner(owner_id).await
    }

    /// Whole-record edit that preserves pipeline position.
    ///
    /// `stage` and `stage_entered_at` move only through [`move_stage`];
    /// edits to them here are discarded.
    ///
    /// [`move_stage`]: PipelineService::move_stage
    pub async fn update_lead(&self, lead: Lead) -> Result<Lead> {
        let current = self.leads.require(lead.id).await?;

        let mut updated = lead;
        updated.stage = current.stage;
        updated.stage_entered_at = current.stage_entered_at;
        updated.created_at = current.created_at;
        updated.updated_at = Utc::now();

        self.leads.put(&updated).await?;
        Ok(updated)
    }

    /// Move a lead to `new_stage` and fire stage automation.
    ///
    /// Re-entering the current stage still fires its rules. Automation
    /// failures are logged by the engine and never fail the move.
    pub async fn move_stage(&self, lead_id: Uuid, new_stage: Stage) -> Result<Lead> {
        let mut lead = self.leads.require(lead_id).await?;
        let old_stage = lead.stage;

        lead.enter_stage(new_stage);
        self.leads.put(&lead).await?;
        tracing::info!(
            lead_id = %lead.id,
            from = %old_stage,
            to = %new_stage,
            "Moved lead to new stage"
        );

        self.engine.on_stage_change(&lead, old_stage, new_stage).await;
        Ok(lead)
    }

    /// Delete a lead. Scheduled tasks referencing it fail at execution.
    pub async fn delete_lead(&self, lead_id: Uuid) -> Result<()> {
        self.leads.delete(lead_id).await?;
        tracing::info!(lead_id = %lead_id, "Deleted lead");
        Ok(())
    }
}
