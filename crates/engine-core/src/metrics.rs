use serde::Serialize;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    batches_fetched: AtomicU64,
    batches_stored: AtomicU64,
    batches_touched: AtomicU64,
    batches_rejected: AtomicU64,
    batches_failed_save: AtomicU64,
    records_transformed: AtomicU64,
    records_failed: AtomicU64,
}

/// Run counters shared between the runner and whoever reports on it.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches_fetched: u64,
    pub batches_stored: u64,
    pub batches_touched: u64,
    pub batches_rejected: u64,
    pub batches_failed_save: u64,
    pub records_transformed: u64,
    pub records_failed: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_fetched(&self) {
        self.inner.batches_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_stored(&self) {
        self.inner.batches_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_touched(&self) {
        self.inner.batches_touched.fetch_add(1, Ordering::Relaxed);
    }

    /// Batch refused by the success threshold or by its transformer.
    pub fn increment_rejected(&self) {
        self.inner.batches_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed_save(&self) {
        self.inner
            .batches_failed_save
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records(&self, transformed: u64, failed: u64) {
        self.inner
            .records_transformed
            .fetch_add(transformed, Ordering::Relaxed);
        self.inner
            .records_failed
            .fetch_add(failed, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches_fetched: self.inner.batches_fetched.load(Ordering::Relaxed),
            batches_stored: self.inner.batches_stored.load(Ordering::Relaxed),
            batches_touched: self.inner.batches_touched.load(Ordering::Relaxed),
            batches_rejected: self.inner.batches_rejected.load(Ordering::Relaxed),
            batches_failed_save: self.inner.batches_failed_save.load(Ordering::Relaxed),
            records_transformed: self.inner.records_transformed.load(Ordering::Relaxed),
            records_failed: self.inner.records_failed.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Batches that ended without reaching `SAVE_ENDED`.
    pub fn batches_in_error(&self) -> u64 {
        self.batches_rejected + self.batches_failed_save
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = Metrics::new();
        let handle = metrics.clone();

        handle.increment_fetched();
        handle.increment_fetched();
        handle.increment_stored();
        handle.increment_rejected();
        handle.add_records(7, 3);

        let snap = metrics.snapshot();
        assert_eq!(snap.batches_fetched, 2);
        assert_eq!(snap.batches_stored, 1);
        assert_eq!(snap.records_transformed, 7);
        assert_eq!(snap.records_failed, 3);
        assert_eq!(snap.batches_in_error(), 1);
    }
}
