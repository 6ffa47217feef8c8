use uuid::Uuid;

use dealflow_core::automation::AutomationRule;
use dealflow_core::store::RuleStore;
use dealflow_core::{DealflowError, Result};

use super::MAX_DELAY_DAYS;

/// Automation rule management.
#[derive(Clone)]
pub struct RulesService {
    rules: RuleStore,
}

impl RulesService {
    /// Create the service over the rule store.
    pub fn new(rules: RuleStore) -> Self {
        Self { rules }
    }

    /// Save a rule. An empty body just means "share silently"; the name
    /// must be non-empty and the delay within the ten-year cap.
    pub async fn save_rule(&self, rule: AutomationRule) -> Result<AutomationRule> {
        if rule.name.trim().is_empty() {
            return Err(DealflowError::Validation(
                "Rule name cannot be empty".to_string(),
            ));
        }
        if rule.delay_days > MAX_DELAY_DAYS {
            return Err(DealflowError::Validation(format!(
                "Rule delay of {} days exceeds the {}-day maximum",
                rule.delay_days, MAX_DELAY_DAYS
            )));
        }
        self.rules.put(&rule).await?;
        tracing::info!(
            rule_id = %rule.id,
            name = %rule.name,
            trigger = %rule.trigger_stage,
            "Saved rule"
        );
        Ok(rule)
    }

    /// Fetch one rule.
    pub async fn get_rule(&self, rule_id: Uuid) -> Result<AutomationRule> {
        self.rules.require(rule_id).await
    }

    /// All rules for an owner.
    pub async fn list_rules(&self, owner_id: Uuid) -> Result<Vec<AutomationRule>> {
        self.rules.for_owner(owner_id).await
    }

    /// Enable or disable a rule.
    pub async fn set_active(&self, rule_id: Uuid, active: bool) -> Result<AutomationRule> {
        let mut rule = self.rules.require(rule_id).await?;
        rule.is_active = active;
        self.rules.put(&rule).await?;
        tracing::info!(rule_id = %rule_id, active = active, "Toggled rule");
        Ok(rule)
    }

    /// Delete a rule. Pending tasks referencing it fail at execution.
    pub async fn delete_rule(&self, rule_id: Uuid) -> Result<()> {
        self.rules.delete(rule_id).await?;
        tracing::info!(rule_id = %rule_id, "Deleted rule");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRig;
    use dealflow_core::pipeline::Stage;

    fn service(rig: &TestRig) -> RulesService {
        RulesService::new(rig.rules.clone())
    }

    #[tokio::test]
    async fn test_save_rule_rejects_blank_name() {
        let rig = TestRig::new();
        let svc = service(&rig);

        let rule = AutomationRule::new(rig.owner_id, "  ", Stage::Meeting);
        let result = svc.save_rule(rule).await;
        assert!(matches!(result, Err(DealflowError::Validation(_))));
    }

    #[tokio::test]
    async fn test_save_rule_caps_delay() {
        let rig = TestRig::new();
        let svc = service(&rig);

        let mut rule = AutomationRule::new(rig.owner_id, "Slow drip", Stage::Meeting);
        rule.delay_days = u32::MAX;
        let result = svc.save_rule(rule).await;
        assert!(matches!(result, Err(DealflowError::Validation(_))));

        let mut at_cap = AutomationRule::new(rig.owner_id, "Slow drip", Stage::Meeting);
        at_cap.delay_days = MAX_DELAY_DAYS;
        svc.save_rule(at_cap).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_and_list_scoped_by_owner() {
        let rig = TestRig::new();
        let svc = service(&rig);

        svc.save_rule(AutomationRule::new(rig.owner_id, "Mine", Stage::Meeting))
            .await
            .unwrap();
        svc.save_rule(AutomationRule::new(Uuid::new_v4(), "Theirs", Stage::Meeting))
            .await
            .unwrap();

        let mine = svc.list_rules(rig.owner_id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "Mine");
    }

    #[tokio::test]
    async fn test_set_active_round_trip() {
        let rig = TestRig::new();
        let svc = service(&rig);

        let rule = svc
            .save_rule(AutomationRule::new(rig.owner_id, "Deck", Stage::PitchShared))
            .await
            .unwrap();

        let paused = svc.set_active(rule.id, false).await.unwrap();
        assert!(!paused.is_active);

        // Paused rules no longer fire.
        let lead = rig.seed_lead(Stage::PitchShared).await;
        rig.engine
            .on_stage_change(&lead, Stage::Meeting, Stage::PitchShared)
            .await;
        rig.sender.assert_nothing_sent();

        let resumed = svc.set_active(rule.id, true).await.unwrap();
        assert!(resumed.is_active);
    }

    #[tokio::test]
    async fn test_delete_rule() {
        let rig = TestRig::new();
        let svc = service(&rig);

        let rule = svc
            .save_rule(AutomationRule::new(rig.owner_id, "Deck", Stage::Meeting))
            .await
            .unwrap();
        svc.delete_rule(rule.id).await.unwrap();

        assert!(matches!(
            svc.get_rule(rule.id).await,
            Err(DealflowError::NotFound(_))
        ));
    }
}
