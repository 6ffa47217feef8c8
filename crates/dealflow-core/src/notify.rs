//! Outbound email types and the delivery seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A fully rendered email, ready for delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,
    /// Rendered subject line.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Names of the documents the email refers to.
    #[serde(default)]
    pub document_names: Vec<String>,
    /// Link to the recipient's portal, when one is configured.
    pub portal_url: Option<String>,
}

/// Delivery backend for outbound email.
///
/// Implementations signal transient failures with
/// [`crate::DealflowError::Email`] and `retriable: true` so the notifier
/// knows to retry them.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver one email.
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}
