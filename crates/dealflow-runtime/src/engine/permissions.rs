use chrono::{Duration, Utc};
use uuid::Uuid;

use dealflow_core::dataroom::DocumentPermission;
use dealflow_core::pipeline::Lead;
use dealflow_core::{template, Result};

use super::RuleEngine;

/// Fixed subject for permission-driven notification emails.
const PERMISSION_EMAIL_SUBJECT: &str = "New document available";

impl RuleEngine {
    /// Grant every owner permission the lead's current stage satisfies.
    ///
    /// Stage-or-later semantics, unlike the exact-trigger rules: a
    /// permission gated on `meeting` also applies to leads further along.
    /// Runs after rule processing on every stage entry. Failures are
    /// logged and skipped, never surfaced.
    pub async fn apply_permissions(&self, lead: &Lead) {
        let permissions = match self.permissions.for_owner(lead.owner_id).await {
            Ok(permissions) => permissions,
            Err(e) => {
                tracing::error!(
                    lead_id = %lead.id,
                    error = %e,
                    "Failed to load permissions for sweep"
                );
                return;
            }
        };

        for permission in &permissions {
            if let Err(e) = self.apply_permission_to_lead(lead, permission).await {
                tracing::warn!(
                    permission_id = %permission.id,
                    lead_id = %lead.id,
                    error = %e,
                    "Permission grant failed"
                );
            }
        }
    }

    /// Owner-wide sweep run by each poll cycle, so a permission whose
    /// delay elapses between stage changes is still granted.
    pub async fn apply_due_permissions(&self, owner_id: Uuid) {
        let leads = match self.leads.for_owner(owner_id).await {
            Ok(leads) => leads,
            Err(e) => {
                tracing::error!(
                    owner_id = %owner_id,
                    error = %e,
                    "Failed to load leads for permission sweep"
                );
                return;
            }
        };

        for lead in &leads {
            self.apply_permissions(lead).await;
        }
    }

    // Stage satisfied and delay elapsed: share idempotently, and email
    // only when the share is new and the permission carries a template.
    async fn apply_permission_to_lead(
        &self,
        lead: &Lead,
        permission: &DocumentPermission,
    ) -> Result<()> {
        if !lead.stage.is_at_or_after(permission.required_stage) {
            return Ok(());
        }
        if permission.delay_days > 0 {
            let available_at = lead
                .stage_entered_at
                .checked_add_signed(Duration::days(permission.delay_days as i64));
            match available_at {
                Some(at) if at <= Utc::now() => {}
                Some(_) => return Ok(()),
                None => {
                    tracing::warn!(
                        permission_id = %permission.id,
                        delay_days = permission.delay_days,
                        "Permission delay out of range, treating as never due"
                    );
                    return Ok(());
                }
            }
        }

        let document = match self.documents.get(permission.document_id).await? {
            Some(document) => document,
            None => {
                tracing::warn!(
                    permission_id = %permission.id,
                    document_id = %permission.document_id,
                    "Permission references missing document, skipping"
                );
                return Ok(());
            }
        };

        let (_, created) = self.ledger.share_document(lead.id, document.id).await?;
        if !created {
            return Ok(());
        }

        let template_body = permission
            .email_template
            .as_deref()
            .filter(|t| !t.is_empty());
        if let Some(template_body) = template_body {
            let body = template::render(template_body, lead);
            if let Err(e) = self
                .notifier
                .send_document_email(
                    lead,
                    PERMISSION_EMAIL_SUBJECT.to_string(),
                    body,
                    std::slice::from_ref(&document),
                    self.portal_url_for(lead),
                )
                .await
            {
                tracing::error!(
                    permission_id = %permission.id,
                    lead_id = %lead.id,
                    error = %e,
                    "Permission email failed, share is kept"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestRig;
    use chrono::{Duration, Utc};
    use dealflow_core::dataroom::DocumentPermission;
    use dealflow_core::Stage;

    #[tokio::test]
    async fn test_zero_delay_permission_granted_at_stage() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Financials").await;
        let lead = rig.seed_lead(Stage::DueDiligence).await;
        rig.seed_permission(doc.id, Stage::DueDiligence, 0).await;

        rig.engine.apply_permissions(&lead).await;

        assert_eq!(rig.ledger.shares_for_lead(lead.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_permission_ignores_earlier_stages() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Financials").await;
        let lead = rig.seed_lead(Stage::Contacted).await;
        rig.seed_permission(doc.id, Stage::DueDiligence, 0).await;

        rig.engine.apply_permissions(&lead).await;

        assert!(rig.ledger.shares_for_lead(lead.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_later_stage_still_satisfies() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Financials").await;
        let lead = rig.seed_lead(Stage::Closed).await;
        rig.seed_permission(doc.id, Stage::Meeting, 0).await;

        rig.engine.apply_permissions(&lead).await;

        assert_eq!(rig.ledger.shares_for_lead(lead.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delayed_permission_waits_for_elapse() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Term Sheet").await;
        let mut lead = rig.seed_lead(Stage::TermSheet).await;
        rig.seed_permission(doc.id, Stage::TermSheet, 7).await;

        rig.engine.apply_permissions(&lead).await;
        assert!(rig.ledger.shares_for_lead(lead.id).await.unwrap().is_empty());

        // Once the stage-entry clock passes the delay, the poller sweep
        // grants it.
        lead.stage_entered_at = Utc::now() - Duration::days(8);
        rig.leads.put(&lead).await.unwrap();

        rig.engine.apply_due_permissions(rig.owner_id).await;
        assert_eq!(rig.ledger.shares_for_lead(lead.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_delay_never_comes_due() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Financials").await;
        let lead = rig.seed_lead(Stage::Meeting).await;
        rig.seed_permission(doc.id, Stage::Meeting, u32::MAX).await;

        // The owner-wide sweep completes and skips the grant.
        rig.engine.apply_due_permissions(rig.owner_id).await;

        assert!(rig.ledger.shares_for_lead(lead.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permission_email_only_on_new_share() {
        let rig = TestRig::new();
        let doc = rig.seed_document("Deck").await;
        let lead = rig.seed_lead(Stage::Meeting).await;

        let permission = DocumentPermission::new(rig.owner_id, doc.id, Stage::Meeting)
            .with_email_template("Hi {{name}}, a new document is ready.");
        rig.permissions.put(&permission).await.unwrap();

        rig.engine.apply_permissions(&lead).await;
        let sent = rig.sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "New document available");
        assert!(sent[0].body.contains(&lead.name));

        // Sweep again: already shared, no second email.
        rig.engine.apply_permissions(&lead).await;
        rig.sender.assert_sent_count(1);
    }

    #[tokio::test]
    async fn test_missing_document_permission_skipped() {
        let rig = TestRig::new();
        let lead = rig.seed_lead(Stage::Meeting).await;
        rig.seed_permission(uuid::Uuid::new_v4(), Stage::Meeting, 0).await;

        rig.engine.apply_permissions(&lead).await;

        assert!(rig.ledger.shares_for_lead(lead.id).await.unwrap().is_empty());
    }
}
