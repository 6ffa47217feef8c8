//! A scriptable in-memory email sender for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{DealflowError, Result};
use crate::notify::{EmailSender, OutboundEmail};

/// Mock [`EmailSender`] that records deliveries and can be scripted to
/// fail.
///
/// Clones share state, so tests can keep a handle for verification while
/// the notifier owns another.
///
/// # Example
///
/// ```ignore
/// let sender = MockEmailSender::new();
/// sender.fail_next_retriable(2);
///
/// // ... drive the notifier ...
///
/// assert_eq!(sender.attempt_count(), 3);
/// assert_eq!(sender.sent().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct MockEmailSender {
    sent: Arc<Mutex<Vec<OutboundEmail>>>,
    attempts: Arc<Mutex<usize>>,
    failures: Arc<Mutex<VecDeque<DealflowError>>>,
}

impl MockEmailSender {
    /// Create a sender that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `n` attempts to fail with a retriable error.
    pub fn fail_next_retriable(&self, n: usize) {
        let mut failures = self.failures.lock().unwrap();
        for _ in 0..n {
            failures.push_back(DealflowError::Email {
                message: "simulated transient failure".to_string(),
                retriable: true,
            });
        }
    }

    /// Script the next `n` attempts to fail permanently.
    pub fn fail_next_non_retriable(&self, n: usize) {
        let mut failures = self.failures.lock().unwrap();
        for _ in 0..n {
            failures.push_back(DealflowError::Email {
                message: "simulated rejection".to_string(),
                retriable: false,
            });
        }
    }

    /// Every email delivered so far.
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Total delivery attempts, including scripted failures.
    pub fn attempt_count(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Assert exactly `expected` emails were delivered.
    pub fn assert_sent_count(&self, expected: usize) {
        let sent = self.sent();
        assert_eq!(
            sent.len(),
            expected,
            "Expected {} delivered emails, found {}. Subjects: {:?}",
            expected,
            sent.len(),
            sent.iter().map(|e| &e.subject).collect::<Vec<_>>()
        );
    }

    /// Assert no email was delivered.
    pub fn assert_nothing_sent(&self) {
        self.assert_sent_count(0);
    }
}

#[async_trait]
impl EmailSender for MockEmailSender {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;

        if let Some(failure) = self.failures.lock().unwrap().pop_front() {
            return Err(failure);
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email(subject: &str) -> OutboundEmail {
        OutboundEmail {
            to: "ada@fund.example".to_string(),
            subject: subject.to_string(),
            body: "hello".to_string(),
            document_names: vec![],
            portal_url: None,
        }
    }

    #[tokio::test]
    async fn test_records_deliveries() {
        let sender = MockEmailSender::new();
        sender.send(&email("one")).await.unwrap();
        sender.send(&email("two")).await.unwrap();

        sender.assert_sent_count(2);
        assert_eq!(sender.attempt_count(), 2);
        assert_eq!(sender.sent()[0].subject, "one");
    }

    #[tokio::test]
    async fn test_scripted_failures_come_first() {
        let sender = MockEmailSender::new();
        sender.fail_next_retriable(1);

        let first = sender.send(&email("x")).await;
        assert!(matches!(
            first,
            Err(DealflowError::Email { retriable: true, .. })
        ));

        sender.send(&email("x")).await.unwrap();
        assert_eq!(sender.attempt_count(), 2);
        sender.assert_sent_count(1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let sender = MockEmailSender::new();
        let handle = sender.clone();

        sender.send(&email("shared")).await.unwrap();
        handle.assert_sent_count(1);
    }
}
