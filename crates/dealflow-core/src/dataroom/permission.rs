use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::Stage;

/// A per-document sharing policy: share once a lead reaches
/// `required_stage` or any later stage, after `delay_days`.
///
/// Distinct from an automation rule in two ways: the stage match is
/// at-or-after rather than exact-entry, and the policy covers one document.
/// A document may carry one permission per stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPermission {
    /// Unique permission ID.
    pub id: Uuid,
    /// Account that owns the document.
    pub owner_id: Uuid,
    /// Document this policy applies to.
    pub document_id: Uuid,
    /// Stage at which (or after which) the document becomes shareable.
    pub required_stage: Stage,
    /// Days to wait after the lead enters a qualifying stage.
    pub delay_days: u32,
    /// Optional email body template sent when the share is granted.
    pub email_template: Option<String>,
    /// When the permission was created.
    pub created_at: DateTime<Utc>,
}

impl DocumentPermission {
    /// Create a new permission with no delay and no email.
    pub fn new(owner_id: Uuid, document_id: Uuid, required_stage: Stage) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            document_id,
            required_stage,
            delay_days: 0,
            email_template: None,
            created_at: Utc::now(),
        }
    }

    /// Set the sharing delay in days.
    pub fn with_delay_days(mut self, days: u32) -> Self {
        self.delay_days = days;
        self
    }

    /// Set the notification email template.
    pub fn with_email_template(mut self, template: impl Into<String>) -> Self {
        self.email_template = Some(template.into());
        self
    }
}
