pub mod engine;
pub mod ledger;
pub mod notify;
pub mod poller;
pub mod scheduler;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_support;

pub use engine::RuleEngine;
pub use ledger::SharingLedger;
pub use notify::{HttpEmailSender, Notifier};
pub use poller::{Poller, PollerConfig, PollerHandle};
pub use scheduler::Scheduler;
pub use services::{DataroomService, PipelineService, RulesService};
pub use store::PgRecordStore;
