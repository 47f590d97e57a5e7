use crate::error::DestinationError;
use async_trait::async_trait;
use model::records::batch::Batch;

/// Sink for transformed records.
///
/// Both operations run with the batch in `SAVE_STARTED` and must leave it in
/// `SAVE_ENDED` or `ERROR`. Returning `Err` instead is fatal to the run.
#[async_trait]
pub trait Destination: Send {
    fn name(&self) -> &str;

    /// Persists `batch.transformed_records()` in batch order.
    async fn store(&mut self, batch: &mut Batch) -> Result<(), DestinationError>;

    /// Acknowledges a batch with nothing to write, so that "processed zero
    /// rows" stays visible to monitoring.
    async fn touch(&mut self, batch: &mut Batch) -> Result<(), DestinationError>;
}
