// crates/ethd-poller/src/alert.rs
//
// Alert-on-error wrapper.
//
// A guarded operation that fails with one of the watched error kinds
// triggers a fire-and-forget alertnotify, then returns the original error
// unchanged. Without an alert command the operation runs unwrapped.

use std::future::Future;
use std::sync::Arc;

use ethd_core::error::{ErrorKind, EthdError};

use crate::notify::{NotifyKind, Notifier};

#[derive(Clone)]
pub struct AlertGuard {
    notifier: Arc<dyn Notifier>,
    kinds: Vec<ErrorKind>,
}

impl AlertGuard {
    pub fn new(notifier: Arc<dyn Notifier>, kinds: &[ErrorKind]) -> Self {
        Self {
            notifier,
            kinds: kinds.to_vec(),
        }
    }

    pub fn watches(&self, kind: ErrorKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Run `operation`, raising an alert if it fails with a watched kind.
    pub async fn guard<T, F>(&self, operation: F) -> Result<T, EthdError>
    where
        F: Future<Output = Result<T, EthdError>>,
    {
        if !self.notifier.is_configured(NotifyKind::Alert) {
            return operation.await;
        }

        match operation.await {
            Err(e) if self.watches(e.kind()) => {
                let message = format!("Error from: {}", e);
                let notifier = Arc::clone(&self.notifier);
                let payload = message.clone();
                tokio::spawn(async move {
                    notifier.execute(NotifyKind::Alert, &payload).await;
                });
                tracing::warn!("Send alertnotify error msg \"{}\"", message);
                Err(e)
            }
            other => other,
        }
    }
}
