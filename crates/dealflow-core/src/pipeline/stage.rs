use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DealflowError;

/// One of the eight ordered pipeline stages a lead passes through.
///
/// Stage identity is the snake_case id; comparisons go through
/// [`Stage::order`], a dense total order over 0..=7. Unknown stage ids are
/// unrepresentable: parsing persisted garbage surfaces as a validation
/// error, never a silent default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Target,
    Contacted,
    Meeting,
    PitchShared,
    DueDiligence,
    TermSheet,
    Committed,
    Closed,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 8] = [
        Stage::Target,
        Stage::Contacted,
        Stage::Meeting,
        Stage::PitchShared,
        Stage::DueDiligence,
        Stage::TermSheet,
        Stage::Committed,
        Stage::Closed,
    ];

    /// Position in the pipeline (dense, injective over 0..=7).
    pub fn order(&self) -> u8 {
        *self as u8
    }

    /// True when this stage is the same as or later than `reference`.
    pub fn is_at_or_after(&self, reference: Stage) -> bool {
        self.order() >= reference.order()
    }

    /// Stable identifier used in storage and rule definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Contacted => "contacted",
            Self::Meeting => "meeting",
            Self::PitchShared => "pitch_shared",
            Self::DueDiligence => "due_diligence",
            Self::TermSheet => "term_sheet",
            Self::Committed => "committed",
            Self::Closed => "closed",
        }
    }

    /// Human-readable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Target => "Target",
            Self::Contacted => "Contacted",
            Self::Meeting => "Meeting",
            Self::PitchShared => "Pitch Shared",
            Self::DueDiligence => "Due Diligence",
            Self::TermSheet => "Term Sheet",
            Self::Committed => "Committed",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = DealflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "target" => Ok(Self::Target),
            "contacted" => Ok(Self::Contacted),
            "meeting" => Ok(Self::Meeting),
            "pitch_shared" => Ok(Self::PitchShared),
            "due_diligence" => Ok(Self::DueDiligence),
            "term_sheet" => Ok(Self::TermSheet),
            "committed" => Ok(Self::Committed),
            "closed" => Ok(Self::Closed),
            _ => Err(DealflowError::Validation(format!("Unknown stage: {}", s))),
        }
    }
}
