use crate::{error::TransformError, transform::Transformer};
use async_trait::async_trait;
use model::records::{batch::Batch, state::RecordState};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A single payload mapping step.
pub trait Transform: Send + Sync {
    fn apply(&self, value: &Value) -> Result<Value, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(&Value) -> Result<Value, TransformError> + Send + Sync,
{
    fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        self(value)
    }
}

pub trait TransformPipelineExt {
    fn add_if<T, F>(self, condition: bool, factory: F) -> Self
    where
        T: Transform + 'static,
        F: FnOnce() -> T;
}

/// Chains transforms over every record of a batch.
///
/// A record whose chain succeeds gets the final value as its transformed
/// payload; the first failing step marks it `ERROR` with that step's
/// message. An empty pipeline copies `data` unchanged.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transform<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Arc::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        self.transforms
            .iter()
            .try_fold(value.clone(), |acc, transform| transform.apply(&acc))
    }
}

impl TransformPipelineExt for TransformPipeline {
    fn add_if<T, F>(mut self, condition: bool, factory: F) -> Self
    where
        T: Transform + 'static,
        F: FnOnce() -> T,
    {
        if condition {
            self = self.add_transform(factory());
        }
        self
    }
}

#[async_trait]
impl Transformer for TransformPipeline {
    async fn transform(&self, batch: &mut Batch) -> Result<(), TransformError> {
        let batch_id = batch.batch_identifier().to_string();

        for (index, mut record) in batch.records_mut().enumerate() {
            if record.state() != RecordState::Created {
                continue;
            }

            match self.apply(record.data()) {
                Ok(out) => record.set_transformed_data(out)?,
                Err(err) => {
                    warn!(batch_id = %batch_id, index, error = %err, "Record failed to transform");
                    record.set_error(err.to_string())?;
                }
            }
        }

        debug!(
            batch_id = %batch_id,
            transformed = batch.count_with_state(RecordState::Transformed),
            failed = batch.count_with_state(RecordState::Error),
            "Batch transformed"
        );
        Ok(())
    }
}
