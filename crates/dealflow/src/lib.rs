//! Dealflow - stage-triggered document automation for fundraising
//! pipelines.
//!
//! Leads move through a fixed eight-stage pipeline. On every stage
//! change, automation rules share data-room documents, send templated
//! emails, or defer either by a number of days; stage-gated permissions
//! open documents to each lead once it reaches the required stage. A
//! background poller executes the deferred work.
//!
//! ```no_run
//! use dealflow::prelude::*;
//!
//! # async fn demo() -> Result<()> {
//! let app = Dealflow::builder()
//!     .config(DealflowConfig::from_file("dealflow.toml")?)
//!     .build()
//!     .await?;
//!
//! let owner_id = Uuid::new_v4();
//! let lead = app
//!     .pipeline()
//!     .create_lead(owner_id, "Jordan Reyes", "jordan@nexus.example", "Nexus Ventures")
//!     .await?;
//! app.pipeline().move_stage(lead.id, Stage::PitchShared).await?;
//!
//! let poller = app.start_poller(owner_id);
//! # poller.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod runtime;

pub mod telemetry;

// Re-export the underlying crates for embedders that need direct access.
pub use dealflow_core;
pub use dealflow_runtime;

pub use runtime::prelude;
pub use runtime::{Dealflow, DealflowBuilder};
