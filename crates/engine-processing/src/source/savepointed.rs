use crate::{
    error::SourceError,
    source::{Source, connector::SourceConnector, listener::SavepointListener},
};
use async_trait::async_trait;
use engine_core::savepoint::SavepointManager;
use model::records::batch::{Batch, BatchMeta};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info};

/// Runs the fixed savepoint lifecycle around a [`SourceConnector`].
///
/// Keeps two positions: `initial`, loaded once per run and never changed,
/// and `current`, advanced on every `next_batch`. Only the batch listener
/// writes `current` back to the manager.
pub struct SavepointedSource<C: SourceConnector> {
    connector: C,
    manager: Option<Arc<dyn SavepointManager>>,
    initial: Option<C::Savepoint>,
    current: Option<C::Savepoint>,
    failed: Arc<AtomicBool>,
}

impl<C: SourceConnector> SavepointedSource<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            manager: None,
            initial: None,
            current: None,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn initial_savepoint(&self) -> Option<&C::Savepoint> {
        self.initial.as_ref()
    }

    pub fn current_savepoint(&self) -> Option<&C::Savepoint> {
        self.current.as_ref()
    }

    /// Whether any batch has entered `ERROR` since `init_savepoint`.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<C: SourceConnector> Source for SavepointedSource<C> {
    fn name(&self) -> &str {
        self.connector.name()
    }

    async fn init_savepoint(
        &mut self,
        manager: Arc<dyn SavepointManager>,
    ) -> Result<(), SourceError> {
        let raw = manager.get().await?;
        let initial = self.connector.string_to_savepoint(&raw)?;
        let current = self.connector.start_from(&initial);

        info!(
            source = %self.connector.name(),
            stored = %raw,
            initial = ?initial,
            current = ?current,
            "Savepoint loaded"
        );

        self.initial = Some(initial);
        self.current = Some(current);
        self.manager = Some(manager);
        self.failed = Arc::new(AtomicBool::new(false));
        Ok(())
    }

    fn has_next_batch(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| self.connector.has_next(current))
    }

    async fn next_batch(&mut self) -> Result<Batch, SourceError> {
        let name = self.connector.name().to_string();
        let (Some(manager), Some(current)) = (self.manager.clone(), self.current.as_mut()) else {
            return Err(SourceError::NotInitialised(name));
        };

        if !self.connector.has_next(current) {
            return Err(SourceError::Exhausted(name));
        }

        let page = self.connector.fetch(current).await?;
        let checkpoint = self.connector.savepoint_to_string(current)?;

        let listener = SavepointListener::new(
            name.as_str(),
            checkpoint,
            self.failed.clone(),
            manager,
        );

        let mut meta = BatchMeta::new(page.batch_number, page.total_batches);
        meta.batch_identifier = page.identifier;

        let mut batch = Batch::new(meta, Some(Arc::new(listener)));
        batch.add_records(page.payloads);

        debug!(
            source = %name,
            batch_id = %batch.batch_identifier(),
            batch_no = batch.batch_number(),
            total_batches = batch.total_batches(),
            records = batch.len(),
            position = ?current,
            "Batch produced"
        );

        Ok(batch)
    }
}
