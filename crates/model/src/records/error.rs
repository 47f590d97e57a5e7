use crate::records::state::{BatchState, RecordState};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record is already in terminal state {0}")]
    AlreadyTerminal(RecordState),
}

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Batch '{batch_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        batch_id: String,
        from: BatchState,
        to: BatchState,
    },

    #[error("State listener failed for batch '{batch_id}' entering {state}: {source}")]
    Listener {
        batch_id: String,
        state: BatchState,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
