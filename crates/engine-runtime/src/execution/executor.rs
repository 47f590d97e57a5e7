use crate::{
    error::RunError,
    execution::{runner::Runner, summary::RunSummary},
};
use engine_config::settings::PipelineSettings;
use engine_core::savepoint::SavepointManager;
use engine_processing::{destination::Destination, source::Source, transform::Transformer};
use std::sync::Arc;

/// The collaborators of one pipeline, already assembled.
pub struct Pipeline {
    pub source: Box<dyn Source>,
    pub transformer: Box<dyn Transformer>,
    pub destination: Box<dyn Destination>,
    pub savepoints: Arc<dyn SavepointManager>,
}

impl Pipeline {
    pub fn new(
        source: impl Source + 'static,
        transformer: impl Transformer + 'static,
        destination: impl Destination + 'static,
        savepoints: Arc<dyn SavepointManager>,
    ) -> Self {
        Self {
            source: Box::new(source),
            transformer: Box::new(transformer),
            destination: Box::new(destination),
            savepoints,
        }
    }
}

/// Runs the pipeline until its source is exhausted or a fatal error occurs.
pub async fn execute(
    pipeline: Pipeline,
    settings: &PipelineSettings,
) -> Result<RunSummary, RunError> {
    Runner::new(pipeline, settings.clone()).run().await
}
