use crate::error::SourceError;
use async_trait::async_trait;
use engine_core::savepoint::SavepointManager;
use model::records::batch::Batch;
use std::sync::Arc;

pub mod connector;
pub mod listener;
pub mod savepointed;

pub use connector::{SourceConnector, SourcePage};
pub use savepointed::SavepointedSource;

/// Producer of batches that owns its resumption point.
///
/// The runner drives a source strictly in sequence: `init_savepoint` once,
/// then `has_next_batch` / `next_batch` pairs. Every returned batch reports
/// its state changes back to the source, which decides from them whether
/// the checkpoint may advance.
#[async_trait]
pub trait Source: Send {
    fn name(&self) -> &str;

    /// Loads the stored checkpoint and derives the first working position.
    async fn init_savepoint(
        &mut self,
        manager: Arc<dyn SavepointManager>,
    ) -> Result<(), SourceError>;

    /// Pure check against the current position; repeated calls agree.
    fn has_next_batch(&self) -> bool;

    /// Advances the current position and materialises the batch for it.
    async fn next_batch(&mut self) -> Result<Batch, SourceError>;
}
