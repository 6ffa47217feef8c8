use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DealflowError;

/// Lifecycle state of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting for its scheduled time.
    Pending,
    /// Claimed by a poll cycle and running.
    Executing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl TaskStatus {
    /// Convert to storage string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether the task has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving to `next` is a legal lifecycle step. Terminal states
    /// admit no transitions, and execution cannot be skipped.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Executing)
                | (Self::Executing, Self::Completed)
                | (Self::Executing, Self::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = DealflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "executing" => Ok(Self::Executing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DealflowError::Validation(format!(
                "Unknown task status: {}",
                other
            ))),
        }
    }
}

/// A deferred rule execution created by a delayed automation rule.
///
/// The poller claims due tasks and replays the originating rule against the
/// lead. The status field follows a strict pending -> executing ->
/// completed | failed lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Unique task ID.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// Lead the rule will act on.
    pub lead_id: Uuid,
    /// Rule to replay when due.
    pub rule_id: Uuid,
    /// Earliest time the task may run.
    pub scheduled_at: DateTime<Utc>,
    /// When execution finished, for terminal tasks.
    pub executed_at: Option<DateTime<Utc>>,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Failure detail, set when `status` is `Failed`.
    pub error: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl ScheduledTask {
    /// Create a pending task due at `scheduled_at`.
    pub fn new(
        owner_id: Uuid,
        lead_id: Uuid,
        rule_id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            lead_id,
            rule_id,
            scheduled_at,
            executed_at: None,
            status: TaskStatus::Pending,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Whether the task's scheduled time has arrived.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }
}
