//! Data room entities: documents, stage-gated permissions, and the
//! sharing ledger records.

mod document;
mod permission;
mod share;

pub use document::Document;
pub use permission::DocumentPermission;
pub use share::SharedDocument;
