use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::Stage;

/// A stage-triggered automation rule.
///
/// When a lead enters `trigger_stage`, the rule shares `document_ids` with
/// the lead and optionally sends an email. A non-zero `delay_days` defers
/// the whole action through the scheduler instead of running it inline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    /// Unique rule ID.
    pub id: Uuid,
    /// Owning user.
    pub owner_id: Uuid,
    /// Human-readable rule name.
    pub name: String,
    /// Stage whose entry fires the rule.
    pub trigger_stage: Stage,
    /// Documents to share when the rule fires. May be empty for
    /// email-only rules.
    #[serde(default)]
    pub document_ids: Vec<Uuid>,
    /// Days to wait before acting. Zero means act immediately.
    #[serde(default)]
    pub delay_days: u32,
    /// Email subject template. Empty disables the email.
    #[serde(default)]
    pub email_subject: String,
    /// Email body template. Empty disables the email.
    #[serde(default)]
    pub email_body: String,
    /// Inactive rules are skipped by the engine.
    pub is_active: bool,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
}

impl AutomationRule {
    /// Create an active rule with no documents, no delay, and no email.
    pub fn new(owner_id: Uuid, name: impl Into<String>, trigger_stage: Stage) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            trigger_stage,
            document_ids: Vec::new(),
            delay_days: 0,
            email_subject: String::new(),
            email_body: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Set the documents shared when the rule fires.
    pub fn with_documents(mut self, document_ids: Vec<Uuid>) -> Self {
        self.document_ids = document_ids;
        self
    }

    /// Defer the rule's action by `days`.
    pub fn with_delay_days(mut self, days: u32) -> Self {
        self.delay_days = days;
        self
    }

    /// Attach an email to the rule. Templates may use `{{name}}`,
    /// `{{firm}}`, and `{{email}}` placeholders.
    pub fn with_email(mut self, subject: impl Into<String>, body: impl Into<String>) -> Self {
        self.email_subject = subject.into();
        self.email_body = body.into();
        self
    }

    /// Whether the rule sends an email when it fires.
    pub fn has_email(&self) -> bool {
        !self.email_body.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rule_is_active_and_immediate() {
        let rule = AutomationRule::new(Uuid::new_v4(), "Send deck", Stage::PitchShared);
        assert!(rule.is_active);
        assert_eq!(rule.delay_days, 0);
        assert!(rule.document_ids.is_empty());
        assert!(!rule.has_email());
    }

    #[test]
    fn test_builders() {
        let doc = Uuid::new_v4();
        let rule = AutomationRule::new(Uuid::new_v4(), "DD pack", Stage::DueDiligence)
            .with_documents(vec![doc])
            .with_delay_days(2)
            .with_email("Hi {{name}}", "Materials attached.");

        assert_eq!(rule.document_ids, vec![doc]);
        assert_eq!(rule.delay_days, 2);
        assert!(rule.has_email());
    }
}
