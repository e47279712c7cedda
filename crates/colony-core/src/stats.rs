use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Counters for events flowing through the reconciler.
#[derive(Debug, Default, Clone)]
pub struct ReconcilerStats {
    /// Applied events by kind name.
    pub applied_by_kind: HashMap<&'static str, u64>,
    /// Events dropped by the per-session sequence watermark.
    pub dropped_stale: u64,
    /// Payloads that failed to parse and were ignored.
    pub ignored_malformed: u64,
    /// Tokens or ends for streams that were not active.
    pub ignored_inactive_stream: u64,
    /// Total events seen, including dropped and ignored ones.
    pub total: u64,
}

impl ReconcilerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&mut self, kind: &'static str) {
        self.total += 1;
        *self.applied_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn record_stale(&mut self) {
        self.total += 1;
        self.dropped_stale += 1;
    }

    pub fn record_malformed(&mut self) {
        self.total += 1;
        self.ignored_malformed += 1;
    }

    pub fn record_inactive_stream(&mut self) {
        self.ignored_inactive_stream += 1;
    }

    pub fn applied_total(&self) -> u64 {
        self.applied_by_kind.values().sum()
    }

    /// Kinds sorted by applied count (descending), for display surfaces.
    pub fn kinds_by_count(&self) -> Vec<(&'static str, u64)> {
        let mut kinds: Vec<_> = self
            .applied_by_kind
            .iter()
            .map(|(&k, &c)| (k, c))
            .collect();
        kinds.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        kinds
    }
}

/// Thread-safe wrapper so display surfaces can read stats off-thread.
#[derive(Debug, Clone, Default)]
pub struct SharedReconcilerStats {
    inner: Arc<RwLock<ReconcilerStats>>,
}

impl SharedReconcilerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self, kind: &'static str) {
        self.inner.write().record_applied(kind);
    }

    pub fn record_stale(&self) {
        self.inner.write().record_stale();
    }

    pub fn record_malformed(&self) {
        self.inner.write().record_malformed();
    }

    pub fn record_inactive_stream(&self) {
        self.inner.write().record_inactive_stream();
    }

    pub fn snapshot(&self) -> ReconcilerStats {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = SharedReconcilerStats::new();
        stats.record_applied("agent_status");
        stats.record_applied("agent_status");
        stats.record_applied("attention");
        stats.record_stale();
        stats.record_malformed();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total, 5);
        assert_eq!(snapshot.applied_total(), 3);
        assert_eq!(snapshot.dropped_stale, 1);
        assert_eq!(snapshot.ignored_malformed, 1);
        assert_eq!(
            snapshot.kinds_by_count(),
            vec![("agent_status", 2), ("attention", 1)]
        );
    }
}
