use crate::{
    error::{RunError, Stage, StageError},
    execution::{executor::Pipeline, summary::RunSummary},
};
use engine_config::settings::PipelineSettings;
use engine_core::metrics::Metrics;
use engine_processing::error::SourceError;
use model::records::{
    batch::Batch,
    state::{BatchState, RecordState},
};
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchOutcome {
    Stored,
    Touched,
    Rejected,
    SaveFailed,
}

/// Drives one pipeline run, one batch at a time.
///
/// Batch N+1 is never fetched before batch N has reached a terminal state,
/// which is what lets the source advance its savepoint without locking.
pub struct Runner {
    pipeline: Pipeline,
    settings: PipelineSettings,
    metrics: Metrics,
}

impl Runner {
    pub fn new(pipeline: Pipeline, settings: PipelineSettings) -> Self {
        Self {
            pipeline,
            settings,
            metrics: Metrics::new(),
        }
    }

    /// Handle to the live counters of this run.
    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    pub async fn run(mut self) -> Result<RunSummary, RunError> {
        let started = Instant::now();
        self.settings.validate()?;

        info!(
            pipeline = %self.settings.name,
            source = %self.pipeline.source.name(),
            destination = %self.pipeline.destination.name(),
            min_success_percentage = self.settings.min_success_percentage,
            "Pipeline run started"
        );

        let savepoints = self.pipeline.savepoints.clone();
        if let Err(err) = self.pipeline.source.init_savepoint(savepoints).await {
            return Err(self.source_failure(err));
        }

        while self.pipeline.source.has_next_batch() {
            let mut batch = match self.pipeline.source.next_batch().await {
                Ok(batch) => batch,
                Err(err) => return Err(self.source_failure(err)),
            };
            self.metrics.increment_fetched();

            match self.process(&mut batch).await {
                Ok(outcome) => self.record_outcome(&batch, outcome),
                Err((stage, err)) => return Err(self.batch_failure(&batch, stage, err)),
            }
        }

        let summary = RunSummary {
            pipeline: self.settings.name.clone(),
            metrics: self.metrics.snapshot(),
            elapsed: started.elapsed(),
        };

        info!(
            pipeline = %summary.pipeline,
            batches = summary.metrics.batches_fetched,
            stored = summary.metrics.batches_stored,
            touched = summary.metrics.batches_touched,
            in_error = summary.metrics.batches_in_error(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Pipeline run finished"
        );

        Ok(summary)
    }

    async fn process(&mut self, batch: &mut Batch) -> Result<BatchOutcome, (Stage, StageError)> {
        self.transform(batch)
            .await
            .map_err(|err| (Stage::Transform, err))?;

        if batch.state() == BatchState::Error {
            return Ok(BatchOutcome::Rejected);
        }

        let stage = if batch.count_with_state(RecordState::Transformed) > 0 {
            Stage::Store
        } else {
            Stage::Touch
        };

        self.save(batch, stage).await.map_err(|err| (stage, err))
    }

    async fn transform(&mut self, batch: &mut Batch) -> Result<(), StageError> {
        batch.set_state(BatchState::TransformStarted).await?;
        self.pipeline.transformer.transform(batch).await?;

        let transformed = batch.count_with_state(RecordState::Transformed);
        let failed = batch.count_with_state(RecordState::Error);
        self.metrics.add_records(transformed as u64, failed as u64);

        if batch.state() == BatchState::Error {
            return Ok(());
        }

        let ratio = batch.success_ratio();
        if ratio < self.settings.min_success_percentage {
            warn!(
                batch_id = %batch.batch_identifier(),
                batch_no = batch.batch_number(),
                total_batches = batch.total_batches(),
                records = batch.len(),
                errors = failed,
                success_ratio = ratio,
                min_success_percentage = self.settings.min_success_percentage,
                "Batch below success threshold"
            );
            batch.set_state(BatchState::Error).await?;
        } else {
            batch.set_state(BatchState::TransformEnded).await?;
        }

        Ok(())
    }

    async fn save(&mut self, batch: &mut Batch, stage: Stage) -> Result<BatchOutcome, StageError> {
        batch.set_state(BatchState::SaveStarted).await?;

        let destination = &mut self.pipeline.destination;
        match stage {
            Stage::Touch => destination.touch(batch).await?,
            _ => destination.store(batch).await?,
        }

        match (batch.state(), stage) {
            (BatchState::SaveEnded, Stage::Touch) => Ok(BatchOutcome::Touched),
            (BatchState::SaveEnded, _) => Ok(BatchOutcome::Stored),
            (BatchState::Error, _) => Ok(BatchOutcome::SaveFailed),
            (other, _) => Err(StageError::Unfinished(other)),
        }
    }

    fn record_outcome(&self, batch: &Batch, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Stored => {
                self.metrics.increment_stored();
                info!(
                    batch_id = %batch.batch_identifier(),
                    batch_no = batch.batch_number(),
                    total_batches = batch.total_batches(),
                    records = batch.count_with_state(RecordState::Transformed),
                    "Batch stored"
                );
            }
            BatchOutcome::Touched => {
                self.metrics.increment_touched();
                info!(
                    batch_id = %batch.batch_identifier(),
                    batch_no = batch.batch_number(),
                    total_batches = batch.total_batches(),
                    records = batch.len(),
                    "Batch touched, nothing to store"
                );
            }
            BatchOutcome::Rejected => {
                self.metrics.increment_rejected();
                warn!(
                    batch_id = %batch.batch_identifier(),
                    batch_no = batch.batch_number(),
                    total_batches = batch.total_batches(),
                    errors = batch.count_with_state(RecordState::Error),
                    "Batch rejected in transform, skipping storage"
                );
            }
            BatchOutcome::SaveFailed => {
                self.metrics.increment_failed_save();
                warn!(
                    batch_id = %batch.batch_identifier(),
                    batch_no = batch.batch_number(),
                    total_batches = batch.total_batches(),
                    "Destination marked batch as failed"
                );
            }
        }
    }

    fn source_failure(&self, source: SourceError) -> RunError {
        let source_name = self.pipeline.source.name().to_string();
        error!(
            pipeline = %self.settings.name,
            source = %source_name,
            error = %source,
            "Source failed, aborting run"
        );
        RunError::Source {
            source_name,
            source,
        }
    }

    fn batch_failure(&self, batch: &Batch, stage: Stage, source: StageError) -> RunError {
        error!(
            pipeline = %self.settings.name,
            batch_id = %batch.batch_identifier(),
            batch_no = batch.batch_number(),
            total_batches = batch.total_batches(),
            state = %batch.state(),
            stage = %stage,
            error = %source,
            "Batch failed, aborting run"
        );
        RunError::Batch {
            batch_identifier: batch.batch_identifier().to_string(),
            batch_number: batch.batch_number(),
            total_batches: batch.total_batches(),
            stage,
            source,
        }
    }
}
