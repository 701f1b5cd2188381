// crates/ethd-poller/src/lib.rs
//
// ethd-poller: Filter polling and notification hooks for the ethd proxy.
//
// Watches the node's new-block and pending-transaction filters, recreates
// filters the node drops, matches transactions against local accounts and
// runs the configured blocknotify/walletnotify/alertnotify commands through
// a single FIFO worker.

pub mod alert;
pub mod filter;
pub mod notify;
pub mod poller;

pub use alert::AlertGuard;
pub use filter::{FilterKind, FilterState};
pub use notify::{CommandNotifier, Notifier, NotifyCommands, NotifyKind};
pub use poller::Poller;
