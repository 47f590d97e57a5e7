use thiserror::Error;

#[derive(Error, Debug)]
pub enum SavepointError {
    #[error("Failed to load savepoint for pipeline '{pipeline}': {source}")]
    Load {
        pipeline: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to update savepoint for pipeline '{pipeline}': {source}")]
    Update {
        pipeline: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to encode savepoint: {0}")]
    Encode(String),

    #[error("Failed to decode savepoint '{raw}': {reason}")]
    Decode { raw: String, reason: String },

    #[error("Failed to read savepoint history: {0}")]
    History(String),
}
