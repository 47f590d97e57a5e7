use crate::records::state::BatchState;
use async_trait::async_trait;
use std::time::Duration;

/// Snapshot of a batch transition handed to its listener.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub batch_identifier: String,
    pub batch_number: u64,
    pub total_batches: u64,
    pub previous: BatchState,
    pub state: BatchState,
    /// Time spent in `previous` before this transition.
    pub dwell: Duration,
}

impl StateChange {
    pub fn is_last_in_group(&self) -> bool {
        self.batch_number >= self.total_batches
    }
}

/// Callback a batch invokes on every state transition.
///
/// The transition does not complete until the listener returns; an error is
/// surfaced to whoever changed the state.
#[async_trait]
pub trait BatchListener: Send + Sync {
    async fn state_changed(
        &self,
        change: &StateChange,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
