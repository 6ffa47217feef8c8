use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A data-room document owned by an account.
///
/// The bytes themselves live in external blob storage; `storage_ref` is the
/// opaque handle the storage collaborator issued for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID.
    pub id: Uuid,
    /// Account that owns this document.
    pub owner_id: Uuid,
    /// Display name shown to investors.
    pub name: String,
    /// Data-room category (e.g. "Pitch Deck", "Financials", "Legal").
    pub category: String,
    /// Opaque reference into blob storage.
    pub storage_ref: String,
    /// File size in bytes.
    pub file_size: u64,
    /// MIME type as reported at upload.
    pub file_type: String,
    /// Optional description.
    pub description: Option<String>,
    /// When the document was uploaded.
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document record.
    pub fn new(
        owner_id: Uuid,
        name: impl Into<String>,
        category: impl Into<String>,
        storage_ref: impl Into<String>,
        file_size: u64,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            category: category.into(),
            storage_ref: storage_ref.into(),
            file_size,
            file_type: file_type.into(),
            description: None,
            uploaded_at: Utc::now(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
