use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::Stage;

/// An investor lead moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Unique lead ID.
    pub id: Uuid,
    /// Account that owns this lead.
    pub owner_id: Uuid,
    /// Contact name.
    pub name: String,
    /// Contact email address.
    pub email: String,
    /// Firm or fund the contact represents.
    pub firm: String,
    /// Current pipeline stage.
    pub stage: Stage,
    /// When the lead entered the current stage. Moves iff `stage` moves.
    pub stage_entered_at: DateTime<Utc>,
    /// When the lead was created.
    pub created_at: DateTime<Utc>,
    /// When the lead was last modified.
    pub updated_at: DateTime<Utc>,
    /// Last recorded outreach, if any.
    pub last_contact_date: Option<DateTime<Utc>>,
    /// Free-form notes, including the stage-change audit trail.
    #[serde(default)]
    pub notes: String,
    /// User-defined tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Lead {
    /// Create a new lead in the initial `target` stage.
    pub fn new(
        owner_id: Uuid,
        name: impl Into<String>,
        email: impl Into<String>,
        firm: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            email: email.into(),
            firm: firm.into(),
            stage: Stage::Target,
            stage_entered_at: now,
            created_at: now,
            updated_at: now,
            last_contact_date: None,
            notes: String::new(),
            tags: Vec::new(),
        }
    }

    /// Set tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Set notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Move the lead into `new_stage`.
    ///
    /// Stamps `stage_entered_at` and `updated_at`, and appends an audit line
    /// to `notes`. Re-entering the current stage still counts as an entry.
    pub fn enter_stage(&mut self, new_stage: Stage) {
        let old_stage = self.stage;
        let now = Utc::now();

        self.stage = new_stage;
        self.stage_entered_at = now;
        self.updated_at = now;
        self.append_note(&format!(
            "[{}] Moved from {} to {}",
            now.format("%Y-%m-%d %H:%M UTC"),
            old_stage.name(),
            new_stage.name()
        ));
    }

    /// Append one line to the notes field.
    pub fn append_note(&mut self, line: &str) {
        if !self.notes.is_empty() {
            self.notes.push('\n');
        }
        self.notes.push_str(line);
    }
}
