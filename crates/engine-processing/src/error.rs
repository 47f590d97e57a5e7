use engine_core::error::SavepointError;
use model::records::error::{BatchError, RecordError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Savepoint operation failed: {0}")]
    Savepoint(#[from] SavepointError),

    #[error("Source '{0}' was asked for a batch before init_savepoint")]
    NotInitialised(String),

    #[error("Source '{0}' has no next batch")]
    Exhausted(String),

    #[error("Fetch failed for source '{source_name}' at {position}: {source}")]
    Fetch {
        source_name: String,
        position: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Transformation failed: {0}")]
    Transformation(String),

    #[error("Validation failed: {rule} - {message}")]
    ValidationFailed { rule: String, message: String },

    #[error("Record update rejected: {0}")]
    Record(#[from] RecordError),

    #[error("Batch update rejected: {0}")]
    Batch(#[from] BatchError),
}

#[derive(Error, Debug)]
pub enum DestinationError {
    #[error("Failed to write batch '{batch_id}' to '{destination}': {source}")]
    Write {
        destination: String,
        batch_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Batch update rejected: {0}")]
    Batch(#[from] BatchError),
}
