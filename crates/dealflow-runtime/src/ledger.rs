use uuid::Uuid;

use dealflow_core::dataroom::SharedDocument;
use dealflow_core::pipeline::Stage;
use dealflow_core::store::{LeadStore, ShareStore};
use dealflow_core::Result;

/// Idempotent record of which documents each lead can see.
///
/// Sharing the same document with the same lead twice returns the original
/// entry unchanged; the ledger is what makes rule re-firing safe.
#[derive(Clone)]
pub struct SharingLedger {
    shares: ShareStore,
    leads: LeadStore,
}

impl SharingLedger {
    /// Create a ledger over the given stores.
    pub fn new(shares: ShareStore, leads: LeadStore) -> Self {
        Self { shares, leads }
    }

    /// Grant `lead_id` access to `document_id`.
    ///
    /// Returns the ledger entry and whether it was newly created. An
    /// existing entry is returned unchanged, original `shared_at` intact.
    pub async fn share_document(
        &self,
        lead_id: Uuid,
        document_id: Uuid,
    ) -> Result<(SharedDocument, bool)> {
        if let Some(existing) = self.shares.find_pair(lead_id, document_id).await? {
            tracing::debug!(
                lead_id = %lead_id,
                document_id = %document_id,
                "Document already shared with lead"
            );
            return Ok((existing, false));
        }

        let share = SharedDocument::new(lead_id, document_id);
        self.shares.put(&share).await?;
        tracing::info!(
            lead_id = %lead_id,
            document_id = %document_id,
            "Shared document with lead"
        );
        Ok((share, true))
    }

    /// Record that the lead opened the document. First view wins; no entry
    /// means nothing to record.
    pub async fn mark_viewed(&self, lead_id: Uuid, document_id: Uuid) -> Result<()> {
        match self.shares.find_pair(lead_id, document_id).await? {
            Some(mut share) => {
                share.mark_viewed();
                self.shares.put(&share).await
            }
            None => {
                tracing::debug!(
                    lead_id = %lead_id,
                    document_id = %document_id,
                    "View on unshared document ignored"
                );
                Ok(())
            }
        }
    }

    /// Record a download. Updates `downloaded_at` on every call and counts
    /// as a first view when none was recorded.
    pub async fn mark_downloaded(&self, lead_id: Uuid, document_id: Uuid) -> Result<()> {
        match self.shares.find_pair(lead_id, document_id).await? {
            Some(mut share) => {
                share.mark_downloaded();
                self.shares.put(&share).await
            }
            None => {
                tracing::debug!(
                    lead_id = %lead_id,
                    document_id = %document_id,
                    "Download on unshared document ignored"
                );
                Ok(())
            }
        }
    }

    /// Everything shared with a lead.
    pub async fn shares_for_lead(&self, lead_id: Uuid) -> Result<Vec<SharedDocument>> {
        self.shares.for_lead(lead_id).await
    }

    /// Every lead a document was shared with.
    pub async fn shares_for_document(&self, document_id: Uuid) -> Result<Vec<SharedDocument>> {
        self.shares.for_document(document_id).await
    }

    /// Share `document_id` with every owner lead already at or past
    /// `required_stage`. Used when a permission is saved so qualifying
    /// leads are granted access retroactively. No emails here and no delay
    /// filtering; per-lead failures are logged and skipped. Returns the
    /// number of new shares.
    pub async fn share_with_eligible_leads(
        &self,
        owner_id: Uuid,
        document_id: Uuid,
        required_stage: Stage,
    ) -> Result<usize> {
        let leads = self.leads.for_owner(owner_id).await?;
        let mut created = 0;

        for lead in leads {
            if !lead.stage.is_at_or_after(required_stage) {
                continue;
            }
            match self.share_document(lead.id, document_id).await {
                Ok((_, true)) => created += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    tracing::warn!(
                        lead_id = %lead.id,
                        document_id = %document_id,
                        error = %e,
                        "Failed to share document with eligible lead"
                    );
                }
            }
        }

        Ok(created)
    }
}
