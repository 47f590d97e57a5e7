use crate::error::SourceError;
use async_trait::async_trait;
use engine_core::error::SavepointError;
use serde_json::Value;
use std::fmt::Debug;

/// Payloads for one batch plus its place in the checkpoint group.
#[derive(Debug, Clone, Default)]
pub struct SourcePage {
    pub payloads: Vec<Value>,
    /// 1-based position within the group.
    pub batch_number: u64,
    pub total_batches: u64,
    pub identifier: Option<String>,
}

impl SourcePage {
    pub fn new(payloads: Vec<Value>, batch_number: u64, total_batches: u64) -> Self {
        Self {
            payloads,
            batch_number,
            total_batches,
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// What a concrete source variant supplies: how it enumerates data and how
/// its checkpoint is shaped. The savepoint lifecycle around it is fixed and
/// lives in [`SavepointedSource`](super::SavepointedSource).
#[async_trait]
pub trait SourceConnector: Send {
    type Savepoint: Clone + Debug + Send + Sync + 'static;

    fn name(&self) -> &str;

    fn savepoint_to_string(&self, savepoint: &Self::Savepoint) -> Result<String, SavepointError>;

    /// An empty `raw` must yield the connector's default starting point.
    fn string_to_savepoint(&self, raw: &str) -> Result<Self::Savepoint, SavepointError>;

    /// First working position for a run resumed from `initial`.
    fn start_from(&self, initial: &Self::Savepoint) -> Self::Savepoint {
        initial.clone()
    }

    fn has_next(&self, current: &Self::Savepoint) -> bool;

    /// Moves `current` to the next position and returns its payloads.
    async fn fetch(&mut self, current: &mut Self::Savepoint) -> Result<SourcePage, SourceError>;
}
