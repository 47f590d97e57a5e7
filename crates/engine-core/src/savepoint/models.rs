use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest checkpoint of a pipeline, as kept by durable managers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavepointRecord {
    pub pipeline: String,
    pub checkpoint: String,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit entry written alongside every checkpoint update.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SavepointLogEntry {
    pub pipeline: String,
    pub seq: u64,
    pub previous: String,
    pub checkpoint: String,
    pub at: DateTime<Utc>,
}
