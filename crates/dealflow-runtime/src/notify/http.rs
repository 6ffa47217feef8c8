use async_trait::async_trait;
use reqwest::StatusCode;

use dealflow_core::config::EmailConfig;
use dealflow_core::notify::{EmailSender, OutboundEmail};
use dealflow_core::{DealflowError, Result};

/// [`EmailSender`] that POSTs messages to an HTTP delivery endpoint with
/// bearer auth. An empty endpoint disables delivery: `send` becomes a
/// logged no-op.
pub struct HttpEmailSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from_address: String,
}

impl HttpEmailSender {
    /// Build a sender from the email configuration.
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            from_address: config.from_address.clone(),
        }
    }
}

// Transient statuses worth another attempt.
fn status_is_retriable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        if self.endpoint.is_empty() {
            tracing::debug!(to = %email.to, "No email endpoint configured, skipping delivery");
            return Ok(());
        }

        let payload = serde_json::json!({
            "from": self.from_address,
            "to": email.to,
            "subject": email.subject,
            "body": email.body,
            "document_names": email.document_names,
            "portal_url": email.portal_url,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DealflowError::Email {
                message: format!("Email request failed: {}", e),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(to = %email.to, status = %status, "Email accepted by endpoint");
            return Ok(());
        }

        let detail = response.text().await.unwrap_or_default();
        Err(DealflowError::Email {
            message: format!("Email endpoint returned {}: {}", status, detail),
            retriable: status_is_retriable(status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_endpoint_skips_delivery() {
        // Default config carries no endpoint: sends succeed without a
        // request.
        let sender = HttpEmailSender::new(&EmailConfig::default());
        let email = OutboundEmail {
            to: "ada@fund.example".to_string(),
            subject: "Hi".to_string(),
            body: "Body".to_string(),
            document_names: vec![],
            portal_url: None,
        };

        sender.send(&email).await.unwrap();
    }

    #[test]
    fn test_status_classification() {
        assert!(status_is_retriable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(status_is_retriable(StatusCode::BAD_GATEWAY));
        assert!(status_is_retriable(StatusCode::TOO_MANY_REQUESTS));
        assert!(status_is_retriable(StatusCode::REQUEST_TIMEOUT));

        assert!(!status_is_retriable(StatusCode::BAD_REQUEST));
        assert!(!status_is_retriable(StatusCode::UNAUTHORIZED));
        assert!(!status_is_retriable(StatusCode::UNPROCESSABLE_ENTITY));
    }
}
