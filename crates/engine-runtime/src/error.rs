use engine_config::error::SettingsError;
use engine_processing::error::{DestinationError, SourceError, TransformError};
use model::records::{error::BatchError, state::BatchState};
use std::fmt;
use thiserror::Error;

/// Phase of a batch in which a fatal error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transform,
    Store,
    Touch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Transform => f.write_str("transform"),
            Stage::Store => f.write_str("store"),
            Stage::Touch => f.write_str("touch"),
        }
    }
}

/// Out-of-band failure raised while a batch was in flight.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Destination(#[from] DestinationError),

    /// Invalid transition, or a listener (savepoint write) failure.
    #[error(transparent)]
    State(#[from] BatchError),

    #[error("Destination returned with the batch still in {0}")]
    Unfinished(BatchState),
}

/// Fatal errors that abort a pipeline run.
///
/// In-band batch failures (`ERROR` state) never show up here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid pipeline settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Source '{source_name}' failed: {source}")]
    Source {
        source_name: String,
        #[source]
        source: SourceError,
    },

    #[error(
        "Batch '{batch_identifier}' ({batch_number}/{total_batches}) failed during {stage}: {source}"
    )]
    Batch {
        batch_identifier: String,
        batch_number: u64,
        total_batches: u64,
        stage: Stage,
        #[source]
        source: StageError,
    },
}
