use crate::error::TransformError;
use async_trait::async_trait;
use model::records::batch::Batch;

pub mod pipeline;

pub use pipeline::{Transform, TransformPipeline, TransformPipelineExt};

/// Converts raw payloads to output payloads, record by record, in place.
///
/// Implementations set each record to `TRANSFORMED` or `ERROR` and may force
/// the whole batch to `ERROR`. They never add, drop or reorder records and
/// never decide whether the batch passes; that is the runner's call.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, batch: &mut Batch) -> Result<(), TransformError>;
}
