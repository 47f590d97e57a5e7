use crate::error::SettingsError;
use engine_core::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tracing::info;

pub mod validator;

pub const DEFAULT_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-stage time budgets in milliseconds.
///
/// The runner does not enforce these; they are handed to connectors that
/// choose to honour them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct StageTimeouts {
    pub fetch_ms: u64,
    pub transform_ms: u64,
    pub store_ms: u64,
    pub savepoint_ms: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            fetch_ms: 30_000,
            transform_ms: 30_000,
            store_ms: 60_000,
            savepoint_ms: 5_000,
        }
    }
}

impl StageTimeouts {
    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    pub fn transform(&self) -> Duration {
        Duration::from_millis(self.transform_ms)
    }

    pub fn store(&self) -> Duration {
        Duration::from_millis(self.store_ms)
    }

    pub fn savepoint(&self) -> Duration {
        Duration::from_millis(self.savepoint_ms)
    }
}

/// Configuration for one pipeline run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Name used for logs and as the savepoint key.
    pub name: String,

    /// Fraction of non-failed records a batch needs to be stored.
    pub min_success_percentage: f64,

    /// Source-defined unit size (rows, report page size, ...).
    pub batch_size: usize,

    /// Advisory; consumed by connectors, never by the runner.
    pub max_retries: u32,

    /// Advisory; consumed by connectors, never by the runner.
    pub timeouts: StageTimeouts,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            min_success_percentage: 1.0,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            timeouts: StageTimeouts::default(),
        }
    }
}

impl PipelineSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_min_success_percentage(mut self, fraction: f64) -> Self {
        self.min_success_percentage = fraction;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Parses and validates settings from a JSON document. Missing fields
    /// take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: PipelineSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let settings = Self::from_json_str(&json)?;
        info!(
            pipeline = %settings.name,
            path = %path.display(),
            "Loaded pipeline settings"
        );
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        validator::validate(self)
    }

    /// Backoff policy connectors can build from the advisory retry count,
    /// capped by the store budget.
    pub fn retry_policy(&self, base_delay: Duration) -> RetryPolicy {
        let policy = RetryPolicy::with_retries(self.max_retries, base_delay);
        let max_delay = policy.max_delay.min(self.timeouts.store());
        RetryPolicy::new(policy.max_attempts, base_delay, max_delay)
    }
}
