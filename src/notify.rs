//! Payment status notifications.
//!
//! Notifications run after the status change is committed, on their own task and
//! under a deadline. A failed or slow notifier is logged and otherwise ignored.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::events::PaymentStatusChanged;
use crate::{PaymentError, Result};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PaymentStatusChanged) -> Result<()>;
}

/// Publishes events as JSON on a NATS subject.
pub struct NatsNotifier {
    client: async_nats::Client,
    subject: String,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&self, event: &PaymentStatusChanged) -> Result<()> {
        let payload =
            serde_json::to_vec(event).map_err(|e| PaymentError::Notification(e.to_string()))?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| PaymentError::Notification(e.to_string()))
    }
}

/// Fallback when no broker is configured.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &PaymentStatusChanged) -> Result<()> {
        info!(
            order_id = event.order_id,
            old_status = %event.old_status,
            new_status = %event.new_status,
            "payment status changed"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    /// Sends `event` in the background. The handle is only useful to tests.
    pub fn dispatch(&self, event: PaymentStatusChanged) -> JoinHandle<()> {
        let notifier = self.notifier.clone();
        let timeout = self.timeout;
        tokio::spawn(async move {
            match tokio::time::timeout(timeout, notifier.notify(&event)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(order_id = event.order_id, error = %e, "payment notification failed")
                }
                Err(_) => warn!(
                    order_id = event.order_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "payment notification timed out"
                ),
            }
        })
    }
}

#[cfg(test)]
#[derive(Default, Clone)]
pub(crate) struct RecordingNotifier {
    events: Arc<tokio::sync::Mutex<Vec<PaymentStatusChanged>>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<PaymentStatusChanged> {
        self.events.lock().await.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &PaymentStatusChanged) -> Result<()> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::PaymentStatus;

    struct Failing;

    #[async_trait]
    impl Notifier for Failing {
        async fn notify(&self, _: &PaymentStatusChanged) -> Result<()> {
            Err(PaymentError::Notification("smtp down".into()))
        }
    }

    struct Hanging;

    #[async_trait]
    impl Notifier for Hanging {
        async fn notify(&self, _: &PaymentStatusChanged) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn event() -> PaymentStatusChanged {
        PaymentStatusChanged::new(1, PaymentStatus::Pending, PaymentStatus::Paid, None, None)
    }

    #[tokio::test]
    async fn test_dispatch_delivers() {
        let recorder = RecordingNotifier::new();
        let dispatcher =
            NotificationDispatcher::new(Arc::new(recorder.clone()), Duration::from_secs(1));
        dispatcher.dispatch(event()).await.unwrap();
        assert_eq!(recorder.events().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_contains_errors() {
        let dispatcher = NotificationDispatcher::new(Arc::new(Failing), Duration::from_secs(1));
        assert!(dispatcher.dispatch(event()).await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_discards_on_timeout() {
        let dispatcher = NotificationDispatcher::new(Arc::new(Hanging), Duration::from_millis(50));
        assert!(dispatcher.dispatch(event()).await.is_ok());
    }
}
