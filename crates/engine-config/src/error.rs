use thiserror::Error;

/// Errors raised while loading or validating pipeline settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The settings document is not valid JSON for `PipelineSettings`.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("min_success_percentage must be a fraction in [0, 1], got {0}")]
    InvalidSuccessPercentage(f64),

    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("Pipeline name must not be empty")]
    EmptyName,
}
