//! Ready-made entities for tests.

use uuid::Uuid;

use crate::automation::AutomationRule;
use crate::dataroom::Document;
use crate::pipeline::{Lead, Stage};

/// A lead already sitting in `stage`.
pub fn lead_in_stage(owner_id: Uuid, stage: Stage) -> Lead {
    let mut lead = Lead::new(owner_id, "Jordan Reyes", "jordan@nexus.example", "Nexus Ventures");
    if stage != Stage::Target {
        lead.enter_stage(stage);
    }
    lead
}

/// A small PDF document named `name`.
pub fn document(owner_id: Uuid, name: &str) -> Document {
    Document::new(
        owner_id,
        name,
        "fundraising",
        format!("s3://dataroom/{}", name.to_lowercase().replace(' ', "-")),
        64 * 1024,
        "application/pdf",
    )
}

/// An active immediate rule sharing `document_ids` on entry to `stage`.
pub fn rule_for_stage(owner_id: Uuid, stage: Stage, document_ids: Vec<Uuid>) -> AutomationRule {
    AutomationRule::new(owner_id, format!("{} rule", stage.name()), stage)
        .with_documents(document_ids)
}
