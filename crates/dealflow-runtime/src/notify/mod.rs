//! Outbound email delivery with bounded retries.

mod http;

pub use http::HttpEmailSender;

use std::sync::Arc;
use std::time::Duration;

use dealflow_core::config::EmailConfig;
use dealflow_core::dataroom::Document;
use dealflow_core::notify::{EmailSender, OutboundEmail};
use dealflow_core::pipeline::Lead;
use dealflow_core::Result;

/// Wraps an [`EmailSender`] with retry and backoff policy.
///
/// Only failures flagged retriable are retried; address rejections and
/// auth errors surface immediately.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn EmailSender>,
    config: EmailConfig,
}

impl Notifier {
    /// Create a notifier over a delivery backend.
    pub fn new(sender: Arc<dyn EmailSender>, config: EmailConfig) -> Self {
        Self { sender, config }
    }

    /// Deliver a document email to `lead`.
    ///
    /// Retries transient failures up to `max_retries` times with
    /// exponential backoff; the last error surfaces once retries are
    /// exhausted.
    pub async fn send_document_email(
        &self,
        lead: &Lead,
        subject: String,
        body: String,
        documents: &[Document],
        portal_url: Option<String>,
    ) -> Result<()> {
        let email = OutboundEmail {
            to: lead.email.clone(),
            subject,
            body,
            document_names: documents.iter().map(|d| d.name.clone()).collect(),
            portal_url,
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.sender.send(&email).await {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!(
                            to = %email.to,
                            attempts = attempt,
                            "Email delivered after retry"
                        );
                    } else {
                        tracing::debug!(to = %email.to, "Email delivered");
                    }
                    return Ok(());
                }
                Err(e) if e.is_retriable() && attempt <= self.config.max_retries => {
                    let backoff = self.backoff_for(attempt);
                    tracing::warn!(
                        to = %email.to,
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Email delivery failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // base * 2^(attempt-1), capped at retry_cap_ms.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self
            .config
            .retry_base_ms
            .saturating_mul(factor)
            .min(self.config.retry_cap_ms);
        Duration::from_millis(ms)
    }
}
