use engine_core::metrics::MetricsSnapshot;
use serde::Serialize;
use std::time::Duration;

/// Outcome of a run that finished without a fatal error.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pipeline: String,
    pub metrics: MetricsSnapshot,
    pub elapsed: Duration,
}

impl RunSummary {
    /// True when every batch reached `SAVE_ENDED`.
    pub fn is_clean(&self) -> bool {
        self.metrics.batches_in_error() == 0
    }
}
