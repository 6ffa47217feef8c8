//! Testing utilities for dealflow.
//!
//! Provides entity fixtures and a scriptable [`MockEmailSender`] so engine
//! and scheduler behavior can be exercised without a real delivery
//! endpoint. Enabled for this crate's own tests and for downstream crates
//! through the `testing` feature.

pub mod fixtures;
pub mod mock_email;

pub use fixtures::{document, lead_in_stage, rule_for_stage};
pub use mock_email::MockEmailSender;
