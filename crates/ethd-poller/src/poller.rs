// crates/ethd-poller/src/poller.rs
//
// Background poller: watches the node's block and pending-transaction
// filters and turns discoveries into hook notifications.
//
// Every notification goes through one bounded FIFO queue drained by a single
// worker, so no two hook commands ever run at the same time and each tick's
// notifications are delivered in discovery order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::try_join_all;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use ethd_core::error::{ErrorKind, EthdError};
use ethd_core::transport::NodeTransport;

use crate::alert::AlertGuard;
use crate::filter::{FilterKind, FilterState, FilterTable};
use crate::notify::{NotifyKind, Notifier};

/// Capacity of the notification queue. Producers wait when it is full.
pub const QUEUE_CAPACITY: usize = 100;

/// Polls per call to [`Poller::poll_with_reconnect`]: the first try and one
/// retry after the filter is rebuilt.
pub const MAX_POLL_ATTEMPTS: usize = 2;

/// Errors that raise an alertnotify when they abort a tick.
pub const ALERT_ERRORS: &[ErrorKind] = &[ErrorKind::Transport, ErrorKind::BadResponse];

type Notification = (NotifyKind, String);

pub struct Poller {
    node: Arc<dyn NodeTransport>,
    notifier: Arc<dyn Notifier>,
    alert: AlertGuard,
    filters: tokio::sync::Mutex<FilterTable>,
    queue: Mutex<Option<mpsc::Sender<Notification>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    ticker: Mutex<Option<JoinHandle<()>>>,
    delivered: Arc<AtomicUsize>,
}

impl Poller {
    /// Create a poller and start its notification worker. Must be called
    /// from within a Tokio runtime.
    pub fn new(node: Arc<dyn NodeTransport>, notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let delivered = Arc::new(AtomicUsize::new(0));
        let worker = tokio::spawn(run_worker(rx, Arc::clone(&notifier), Arc::clone(&delivered)));

        Self {
            node,
            alert: AlertGuard::new(Arc::clone(&notifier), ALERT_ERRORS),
            notifier,
            filters: tokio::sync::Mutex::new(FilterTable::new()),
            queue: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            ticker: Mutex::new(None),
            delivered,
        }
    }

    pub fn has_blocknotify(&self) -> bool {
        self.notifier.is_configured(NotifyKind::Block)
    }

    pub fn has_walletnotify(&self) -> bool {
        self.notifier.is_configured(NotifyKind::Wallet)
    }

    pub fn has_alertnotify(&self) -> bool {
        self.notifier.is_configured(NotifyKind::Alert)
    }

    /// Notifications the worker has finished so far.
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    pub async fn filter_state(&self, kind: FilterKind) -> FilterState {
        self.filters.lock().await.get(kind).clone()
    }

    // -----------------------------------------------------------------
    // Scheduling
    // -----------------------------------------------------------------

    /// Spawn the tick loop. Ticks never overlap: a slow tick delays the next.
    pub fn start(self: &Arc<Self>, period: Duration) {
        let poller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                poller.tick().await;
            }
        });
        tracing::info!("Poller started ({}ms period)", period.as_millis());

        if let Some(previous) = lock(&self.ticker).replace(handle) {
            previous.abort();
        }
    }

    /// Run one scheduling round: the block channel, then the pending channel,
    /// each only if its hook is configured. Errors are logged.
    pub async fn tick(&self) {
        if self.has_blocknotify() {
            if let Err(e) = self.blocknotify().await {
                tracing::warn!("Block poll failed: {}", e);
            }
        }
        if self.has_walletnotify() {
            if let Err(e) = self.walletnotify().await {
                tracing::warn!("Pending transaction poll failed: {}", e);
            }
        }
    }

    /// Stop ticking and wait for already queued notifications to run.
    pub async fn shutdown(&self) {
        self.abort_ticker();
        drop(self.take_queue());
        let worker = lock(&self.worker).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!("Notification worker ended abnormally: {}", e);
            }
        }
        tracing::info!("Poller shut down, {} notifications delivered", self.delivered());
    }

    /// Cancel ticking and the worker immediately. Queued notifications are
    /// discarded and counted in the log.
    pub fn stop(&self) {
        self.abort_ticker();
        let discarded = self
            .take_queue()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0);
        if let Some(worker) = lock(&self.worker).take() {
            worker.abort();
        }
        if discarded > 0 {
            tracing::warn!("Poller stopped, {} queued notifications discarded", discarded);
        } else {
            tracing::info!("Poller stopped");
        }
    }

    fn abort_ticker(&self) {
        if let Some(ticker) = lock(&self.ticker).take() {
            ticker.abort();
        }
    }

    fn take_queue(&self) -> Option<mpsc::Sender<Notification>> {
        lock(&self.queue).take()
    }

    /// Queue a notification, waiting while the queue is full.
    async fn enqueue(&self, kind: NotifyKind, payload: &str) {
        let tx = lock(&self.queue).clone();
        let Some(tx) = tx else {
            tracing::warn!("Poller stopped, dropping {} for {}", kind, payload);
            return;
        };
        if tx.send((kind, payload.to_string())).await.is_err() {
            tracing::warn!("Notification worker gone, dropping {} for {}", kind, payload);
        }
    }

    // -----------------------------------------------------------------
    // Channels
    // -----------------------------------------------------------------

    /// Poll the block filter. Returns the number of new blocks.
    pub async fn blocknotify(&self) -> Result<usize, EthdError> {
        self.alert.guard(self.block_tick()).await
    }

    /// Poll the pending-transaction filter. Returns the number of local
    /// transactions found.
    pub async fn walletnotify(&self) -> Result<usize, EthdError> {
        self.alert.guard(self.pending_tick()).await
    }

    /// For each new block: at most one wallet notification (for its first
    /// local transaction), then one block notification.
    async fn block_tick(&self) -> Result<usize, EthdError> {
        let hashes = self.poll_with_reconnect(FilterKind::Latest).await?;
        if hashes.is_empty() {
            return Ok(0);
        }
        tracing::info!("New blocks: {:?}", hashes);
        let accounts = self.accounts().await?;

        for hash in &hashes {
            let block = self
                .node
                .call("eth_getBlockByHash", vec![json!(hash), json!(false)])
                .await?;
            if block.is_null() {
                tracing::warn!("Block {} vanished before it could be inspected", hash);
            }
            for txid in string_list(&block["transactions"]) {
                if self.is_account_transaction(&txid, &accounts).await? {
                    self.enqueue(NotifyKind::Wallet, &txid).await;
                    break;
                }
            }
            tracing::info!("Block: {}", hash);
            self.enqueue(NotifyKind::Block, hash).await;
        }
        Ok(hashes.len())
    }

    /// Check new pending transactions concurrently; every local one gets its
    /// own wallet notification.
    async fn pending_tick(&self) -> Result<usize, EthdError> {
        let txids = self.poll_with_reconnect(FilterKind::Pending).await?;
        if txids.is_empty() {
            return Ok(0);
        }
        tracing::info!("New transactions: {:?}", txids);
        let accounts = self.accounts().await?;

        let accounts = &accounts;
        let checks = txids.iter().map(|txid| async move {
            let local = self.is_account_transaction(txid, accounts).await?;
            if local {
                tracing::info!("Trans: {}", txid);
                self.enqueue(NotifyKind::Wallet, txid).await;
            }
            Ok::<bool, EthdError>(local)
        });
        let found = try_join_all(checks).await?;
        Ok(found.into_iter().filter(|local| *local).count())
    }

    // -----------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------

    /// Fetch changes for the `kind` filter, creating it if needed.
    ///
    /// A node error on the poll means the filter was dropped: the handle is
    /// discarded, a new filter created and the poll retried, up to
    /// [`MAX_POLL_ATTEMPTS`] polls in total. Errors while creating a filter
    /// and transport errors propagate immediately.
    pub async fn poll_with_reconnect(&self, kind: FilterKind) -> Result<Vec<String>, EthdError> {
        let mut filters = self.filters.lock().await;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let id = match filters.get(kind) {
                FilterState::Active(id) => id.clone(),
                FilterState::NoFilter => {
                    tracing::warn!("Filter \"{}\" not initialized, creating a new one", kind);
                    self.build_filter(kind, &mut filters).await?
                }
            };

            match self.node.call("eth_getFilterChanges", vec![json!(id)]).await {
                Ok(changes) => return Ok(string_list(&changes)),
                Err(e @ EthdError::BadResponse { .. }) => {
                    filters.transition(kind, FilterState::NoFilter);
                    if attempt >= MAX_POLL_ATTEMPTS {
                        return Err(e);
                    }
                    tracing::warn!("Filter \"{}\" dropped ({}), creating a new one", kind, e);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn build_filter(
        &self,
        kind: FilterKind,
        filters: &mut FilterTable,
    ) -> Result<String, EthdError> {
        let id = self.node.call(kind.create_method(), vec![]).await?;
        let id = match id {
            Value::String(id) => id,
            other => other.to_string(),
        };
        filters.transition(kind, FilterState::Active(id.clone()));
        Ok(id)
    }

    // -----------------------------------------------------------------
    // Matching
    // -----------------------------------------------------------------

    async fn accounts(&self) -> Result<Vec<String>, EthdError> {
        Ok(string_list(&self.node.call("eth_accounts", vec![]).await?))
    }

    /// Whether either endpoint of `txid` is one of `accounts`. A transaction
    /// the node no longer knows is not a match.
    pub async fn is_account_transaction(
        &self,
        txid: &str,
        accounts: &[String],
    ) -> Result<bool, EthdError> {
        let tx = self
            .node
            .call("eth_getTransactionByHash", vec![json!(txid)])
            .await?;
        if tx.is_null() {
            tracing::warn!("Something happened with transaction {}", txid);
            return Ok(false);
        }

        for direction in ["from", "to"] {
            if let Some(address) = tx[direction].as_str() {
                if accounts.iter().any(|a| a.eq_ignore_ascii_case(address)) {
                    tracing::info!("Found transaction for account \"{}\"", address);
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<Notification>,
    notifier: Arc<dyn Notifier>,
    delivered: Arc<AtomicUsize>,
) {
    while let Some((kind, payload)) = rx.recv().await {
        notifier.execute(kind, &payload).await;
        delivered.fetch_add(1, Ordering::SeqCst);
    }
    tracing::debug!("Notification queue closed");
}

/// Lock a handle slot. The slots hold no invariants a panic could break, so a
/// poisoned lock is used as is.
fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_list() {
        assert_eq!(string_list(&json!(["0x1", 2, "0x3"])), vec!["0x1", "0x3"]);
        assert!(string_list(&Value::Null).is_empty());
    }

    #[test]
    fn test_alert_errors() {
        assert!(ALERT_ERRORS.contains(&ErrorKind::Transport));
        assert!(ALERT_ERRORS.contains(&ErrorKind::BadResponse));
        assert!(!ALERT_ERRORS.contains(&ErrorKind::InvalidParameter));
    }
}
