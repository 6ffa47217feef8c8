//! Automation entities: stage-triggered rules and their deferred tasks.

mod rule;
mod task;

pub use rule::AutomationRule;
pub use task::{ScheduledTask, TaskStatus};
