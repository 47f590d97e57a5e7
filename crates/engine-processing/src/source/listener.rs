use async_trait::async_trait;
use engine_core::savepoint::SavepointManager;
use model::records::{
    listener::{BatchListener, StateChange},
    state::BatchState,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{info, warn};

/// Listener a source attaches to each batch it emits.
///
/// `checkpoint` is the serialized position the source reached when it
/// produced the batch. It is written only once the batch, as the last of its
/// group, reaches `SAVE_ENDED` and no batch has failed since the run began.
pub struct SavepointListener {
    source_name: String,
    checkpoint: String,
    failed: Arc<AtomicBool>,
    manager: Arc<dyn SavepointManager>,
}

impl SavepointListener {
    pub fn new(
        source_name: impl Into<String>,
        checkpoint: String,
        failed: Arc<AtomicBool>,
        manager: Arc<dyn SavepointManager>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            checkpoint,
            failed,
            manager,
        }
    }
}

#[async_trait]
impl BatchListener for SavepointListener {
    async fn state_changed(
        &self,
        change: &StateChange,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match change.state {
            BatchState::Error => {
                if !self.failed.swap(true, Ordering::SeqCst) {
                    warn!(
                        source = %self.source_name,
                        batch_id = %change.batch_identifier,
                        batch_no = change.batch_number,
                        total_batches = change.total_batches,
                        "Batch failed, savepoint frozen for the rest of the run"
                    );
                }
                Ok(())
            }
            BatchState::SaveEnded if change.is_last_in_group() => {
                if self.failed.load(Ordering::SeqCst) {
                    info!(
                        source = %self.source_name,
                        batch_id = %change.batch_identifier,
                        "Group complete but an earlier batch failed, savepoint not advanced"
                    );
                    return Ok(());
                }

                self.manager.update(&self.checkpoint).await?;
                info!(
                    source = %self.source_name,
                    batch_id = %change.batch_identifier,
                    total_batches = change.total_batches,
                    savepoint = %self.checkpoint,
                    "Savepoint advanced"
                );
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
