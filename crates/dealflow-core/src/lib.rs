pub mod automation;
pub mod config;
pub mod dataroom;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod store;
pub mod template;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use automation::{AutomationRule, ScheduledTask, TaskStatus};
pub use config::{AutomationConfig, DealflowConfig, EmailConfig, StoreBackend, StoreConfig};
pub use dataroom::{Document, DocumentPermission, SharedDocument};
pub use error::{DealflowError, Result};
pub use notify::{EmailSender, OutboundEmail};
pub use pipeline::{Lead, Stage};
pub use store::{
    DocumentStore, Filter, LeadStore, MemoryStore, PermissionStore, RecordStore, RuleStore,
    ShareStore, TaskStore,
};
