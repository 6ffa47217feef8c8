use chrono::{DateTime, Utc};
use uuid::Uuid;

use dealflow_core::automation::ScheduledTask;
use dealflow_core::store::{LeadStore, RuleStore, TaskStore};
use dealflow_core::Result;

use crate::engine::RuleEngine;

/// Creates deferred rule tasks and drives them through their lifecycle.
///
/// Execution is claim-first: the pending -> executing transition is an
/// atomic guarded update, so a task polled by two sessions runs once. A
/// crash mid-run leaves the task visibly `executing`; there is no
/// automatic recovery of stuck tasks.
#[derive(Clone)]
pub struct Scheduler {
    tasks: TaskStore,
    leads: LeadStore,
    rules: RuleStore,
}

impl Scheduler {
    /// Create a scheduler over the given stores.
    pub fn new(tasks: TaskStore, leads: LeadStore, rules: RuleStore) -> Self {
        Self {
            tasks,
            leads,
            rules,
        }
    }

    /// Materialize a deferred rule execution.
    ///
    /// Always a fresh pending task; repeated stage entries each defer
    /// their own execution, with no dedup.
    pub async fn create_task(
        &self,
        owner_id: Uuid,
        lead_id: Uuid,
        rule_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Result<ScheduledTask> {
        let task = ScheduledTask::new(owner_id, lead_id, rule_id, scheduled_at);
        self.tasks.put(&task).await?;
        tracing::info!(
            task_id = %task.id,
            lead_id = %lead_id,
            rule_id = %rule_id,
            scheduled_at = %scheduled_at,
            "Scheduled deferred rule execution"
        );
        Ok(task)
    }

    /// Due pending tasks for an owner.
    ///
    /// A read failure is logged at warn and returned as an empty batch so
    /// one bad read never wedges the polling loop.
    pub async fn pending_tasks(&self, owner_id: Uuid) -> Vec<ScheduledTask> {
        match self.tasks.due(owner_id, Utc::now()).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(owner_id = %owner_id, error = %e, "Failed to load due tasks");
                Vec::new()
            }
        }
    }

    /// All tasks for an owner, any status.
    pub async fn tasks_for_owner(&self, owner_id: Uuid) -> Result<Vec<ScheduledTask>> {
        self.tasks.for_owner(owner_id).await
    }

    /// Claim and run one due task.
    ///
    /// An already-claimed task is skipped silently. The referenced lead
    /// and rule must both still exist; either missing fails the task. Rule
    /// failures are recorded on the task row and return `Ok`; an error
    /// here means the lifecycle bookkeeping itself failed.
    pub async fn execute_task(&self, engine: &RuleEngine, task_id: Uuid) -> Result<()> {
        if !self.tasks.claim(task_id).await? {
            tracing::debug!(task_id = %task_id, "Task already claimed or gone, skipping");
            return Ok(());
        }

        match self.run_claimed(engine, task_id).await {
            Ok(()) => {
                self.tasks.complete(task_id).await?;
                tracing::info!(task_id = %task_id, "Task completed");
                Ok(())
            }
            Err(e) => {
                tracing::error!(task_id = %task_id, error = %e, "Task failed");
                self.tasks.fail(task_id, &e.to_string()).await?;
                Ok(())
            }
        }
    }

    async fn run_claimed(&self, engine: &RuleEngine, task_id: Uuid) -> Result<()> {
        let task = self.tasks.require(task_id).await?;
        let lead = self.leads.require(task.lead_id).await?;
        let rule = self.rules.require(task.rule_id).await?;
        // The delay already elapsed: go straight to the perform path so
        // the task can never re-arm itself.
        engine.perform_rule(&lead, &rule).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestRig;
    use chrono::Duration;
    use dealflow_core::automation::TaskStatus;
    use dealflow_core::Stage;

    #[tokio::test]
    async fn test_create_task_is_pending_without_dedup() {
        let rig = TestRig::new();
        let lead = rig.seed_lead(Stage::Meeting).await;
        let rule = rig.seed_rule(Stage::Meeting, vec![]).await;

        let due_at = Utc::now() + Duration::days(3);
        let first = rig
            .scheduler
            .create_task(rig.owner_id, lead.id, rule.id, due_at)
            .await
            .unwrap();
        let second = rig
            .scheduler
            .create_task(rig.owner_id, lead.id, rule.id, due_at)
            .await
            .unwrap();

        assert_eq!(first.status, TaskStatus::Pending);
        assert_ne!(first.id, second.id);
        assert_eq!(
            rig.scheduler.tasks_for_owner(rig.owner_id).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_pending_tasks_excludes_future() {
        let rig = TestRig::new();
        let lead = rig.seed_lead(Stage::Meeting).await;
        let rule = rig.seed_rule(Stage::Meeting, vec![]).await;

        rig.scheduler
            .create_task(rig.owner_id, lead.id, rule.id, Utc::now() - Duration::minutes(1))
            .await
            .unwrap();
        rig.scheduler
            .create_task(rig.owner_id, lead.id, rule.id, Utc::now() + Duration::days(1))
            .await
            .unwrap();

        let due = rig.scheduler.pending_tasks(rig.owner_id).await;
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_completes_and_shares() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Deck").await;
        let lead = rig.seed_lead(Stage::PitchShared).await;
        let rule = rig.seed_rule(Stage::PitchShared, vec![doc.id]).await;

        let task = rig
            .scheduler
            .create_task(rig.owner_id, lead.id, rule.id, Utc::now())
            .await
            .unwrap();

        rig.scheduler.execute_task(&rig.engine, task.id).await.unwrap();

        let done = rig.task(task.id).await;
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.executed_at.is_some());
        assert_eq!(rig.ledger.shares_for_lead(lead.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_deleted_lead_fails_task() {
        let rig = TestRig::new();
        let lead = rig.seed_lead(Stage::Meeting).await;
        let rule = rig.seed_rule(Stage::Meeting, vec![]).await;

        let task = rig
            .scheduler
            .create_task(rig.owner_id, lead.id, rule.id, Utc::now())
            .await
            .unwrap();
        rig.leads.delete(lead.id).await.unwrap();

        // The batch-level call still succeeds; the failure lands on the row.
        rig.scheduler.execute_task(&rig.engine, task.id).await.unwrap();

        let failed = rig.task(task.id).await;
        assert_eq!(failed.status, TaskStatus::Failed);
        let error = failed.error.unwrap();
        assert!(!error.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_claim_executes_once() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Deck").await;
        let lead = rig.seed_lead(Stage::Meeting).await;
        let rule = rig.seed_rule(Stage::Meeting, vec![doc.id]).await;

        let task = rig
            .scheduler
            .create_task(rig.owner_id, lead.id, rule.id, Utc::now())
            .await
            .unwrap();

        let (a, b) = tokio::join!(
            rig.scheduler.execute_task(&rig.engine, task.id),
            rig.scheduler.execute_task(&rig.engine, task.id),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(rig.task(task.id).await.status, TaskStatus::Completed);
        assert_eq!(rig.ledger.shares_for_lead(lead.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_executing_delayed_rule_never_rearms() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Deck").await;
        let lead = rig.seed_lead(Stage::Meeting).await;
        let mut rule = rig.seed_rule(Stage::Meeting, vec![doc.id]).await;
        rule.delay_days = 3;
        rig.rules.put(&rule).await.unwrap();

        let task = rig
            .scheduler
            .create_task(rig.owner_id, lead.id, rule.id, Utc::now())
            .await
            .unwrap();

        rig.scheduler.execute_task(&rig.engine, task.id).await.unwrap();

        // The delayed rule ran instead of scheduling itself again.
        let all = rig.scheduler.tasks_for_owner(rig.owner_id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, TaskStatus::Completed);
        assert_eq!(rig.ledger.shares_for_lead(lead.id).await.unwrap().len(), 1);
    }
}
