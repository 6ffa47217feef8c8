//! Application services: the operations an embedding UI calls.

mod dataroom;
mod pipeline;
mod rules;

/// Upper bound on `delay_days` for rules and permissions, ten years.
/// Keeps every stored delay inside the range schedule arithmetic can
/// represent.
pub(crate) const MAX_DELAY_DAYS: u32 = 3650;

pub use dataroom::DataroomService;
pub use pipeline::PipelineService;
pub use rules::RulesService;
