use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sharing-ledger entry: document `document_id` is visible to lead
/// `lead_id`.
///
/// At most one entry exists per `(lead_id, document_id)` pair; the ledger
/// enforces that with a look-up-before-insert. View and download marks feed
/// the engagement view of the investor portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedDocument {
    /// Unique ledger entry ID.
    pub id: Uuid,
    /// Lead the document was shared with.
    pub lead_id: Uuid,
    /// Shared document.
    pub document_id: Uuid,
    /// When access was granted.
    pub shared_at: DateTime<Utc>,
    /// First time the lead opened the document, if ever.
    pub viewed_at: Option<DateTime<Utc>>,
    /// Most recent download, if any.
    pub downloaded_at: Option<DateTime<Utc>>,
}

impl SharedDocument {
    /// Create a fresh ledger entry with no engagement marks.
    pub fn new(lead_id: Uuid, document_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id,
            document_id,
            shared_at: Utc::now(),
            viewed_at: None,
            downloaded_at: None,
        }
    }

    /// Record a view. The first view wins; later calls keep the original
    /// timestamp.
    pub fn mark_viewed(&mut self) {
        if self.viewed_at.is_none() {
            self.viewed_at = Some(Utc::now());
        }
    }

    /// Record a download. The latest download wins, and a download counts
    /// as a view when none was recorded yet.
    pub fn mark_downloaded(&mut self) {
        let now = Utc::now();
        self.downloaded_at = Some(now);
        if self.viewed_at.is_none() {
            self.viewed_at = Some(now);
        }
    }
}
