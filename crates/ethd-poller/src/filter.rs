// crates/ethd-poller/src/filter.rs
//
// Node-side filter handles and their per-kind state.
//
// Valid transitions, independently for each kind:
//   NoFilter -> Active(id)    (filter created)
//   Active(id) -> NoFilter    (node dropped the filter)

use std::fmt;

/// The two event streams the poller watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKind {
    /// New blocks.
    Latest,
    /// New pending transactions.
    Pending,
}

impl FilterKind {
    /// Node method that installs a filter of this kind.
    pub fn create_method(&self) -> &'static str {
        match self {
            FilterKind::Latest => "eth_newBlockFilter",
            FilterKind::Pending => "eth_newPendingTransactionFilter",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Latest => write!(f, "latest"),
            FilterKind::Pending => write!(f, "pending"),
        }
    }
}

/// Lifecycle of one filter handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FilterState {
    #[default]
    NoFilter,
    /// A live filter with its node-issued id.
    Active(String),
}

impl fmt::Display for FilterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterState::NoFilter => write!(f, "NoFilter"),
            FilterState::Active(id) => write!(f, "Active({})", id),
        }
    }
}

/// Filter handles keyed by kind. Held in memory for the process lifetime.
#[derive(Debug, Default)]
pub struct FilterTable {
    latest: FilterState,
    pending: FilterState,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: FilterKind) -> &FilterState {
        match kind {
            FilterKind::Latest => &self.latest,
            FilterKind::Pending => &self.pending,
        }
    }

    /// Move the filter of `kind` to `next`.
    pub fn transition(&mut self, kind: FilterKind, next: FilterState) {
        let slot = match kind {
            FilterKind::Latest => &mut self.latest,
            FilterKind::Pending => &mut self.pending,
        };
        tracing::debug!("Filter \"{}\": {} -> {}", kind, slot, next);
        *slot = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_methods() {
        assert_eq!(FilterKind::Latest.create_method(), "eth_newBlockFilter");
        assert_eq!(
            FilterKind::Pending.create_method(),
            "eth_newPendingTransactionFilter"
        );
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut table = FilterTable::new();
        assert_eq!(table.get(FilterKind::Latest), &FilterState::NoFilter);

        table.transition(FilterKind::Latest, FilterState::Active("0x1".into()));
        assert_eq!(table.get(FilterKind::Latest), &FilterState::Active("0x1".into()));
        assert_eq!(table.get(FilterKind::Pending), &FilterState::NoFilter);

        table.transition(FilterKind::Latest, FilterState::NoFilter);
        assert_eq!(table.get(FilterKind::Latest), &FilterState::NoFilter);
    }

    #[test]
    fn test_display() {
        assert_eq!(FilterKind::Pending.to_string(), "pending");
        assert_eq!(FilterState::Active("0x2".into()).to_string(), "Active(0x2)");
    }
}
