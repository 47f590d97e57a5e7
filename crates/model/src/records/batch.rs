use crate::records::{
    error::BatchError,
    listener::{BatchListener, StateChange},
    record::{Record, RecordMut},
    state::{BatchState, RecordState},
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::{fmt, sync::Arc, time::Duration};
use tracing::debug;

/// Position of a batch inside its checkpoint group, as declared by the source.
#[derive(Debug, Clone, Default)]
pub struct BatchMeta {
    /// 1-based position within the group.
    pub batch_number: u64,
    pub total_batches: u64,
    /// Opaque identifier for logs; a random UUID is used when absent.
    pub batch_identifier: Option<String>,
}

impl BatchMeta {
    pub fn new(batch_number: u64, total_batches: u64) -> Self {
        Self {
            batch_number,
            total_batches,
            batch_identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.batch_identifier = Some(identifier.into());
        self
    }
}

/// One unit of pipeline work: an ordered set of records plus its phase state.
pub struct Batch {
    batch_number: u64,
    total_batches: u64,
    batch_identifier: String,
    state: BatchState,
    state_entered_at: DateTime<Utc>,
    records: Vec<Record>,
    listener: Option<Arc<dyn BatchListener>>,
}

impl Batch {
    pub fn new(meta: BatchMeta, listener: Option<Arc<dyn BatchListener>>) -> Self {
        let batch_identifier = meta
            .batch_identifier
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Batch {
            batch_number: meta.batch_number,
            total_batches: meta.total_batches,
            batch_identifier,
            state: BatchState::Created,
            state_entered_at: Utc::now(),
            records: Vec::new(),
            listener,
        }
    }

    /// Appends one `CREATED` record per payload, in input order.
    pub fn add_records<I>(&mut self, payloads: I)
    where
        I: IntoIterator<Item = Value>,
    {
        self.records.extend(payloads.into_iter().map(Record::new));
    }

    /// Moves the batch to `state` and waits for the listener to observe it.
    pub async fn set_state(&mut self, state: BatchState) -> Result<(), BatchError> {
        if !self.state.can_transition_to(state) {
            return Err(BatchError::InvalidTransition {
                batch_id: self.batch_identifier.clone(),
                from: self.state,
                to: state,
            });
        }

        let previous = self.state;
        let dwell = self.dwell();
        self.state = state;
        self.state_entered_at = Utc::now();

        debug!(
            batch_id = %self.batch_identifier,
            from = %previous,
            to = %state,
            dwell_ms = dwell.as_millis() as u64,
            "Batch state changed"
        );

        let Some(listener) = &self.listener else {
            return Ok(());
        };

        let change = StateChange {
            batch_identifier: self.batch_identifier.clone(),
            batch_number: self.batch_number,
            total_batches: self.total_batches,
            previous,
            state,
            dwell,
        };

        listener
            .state_changed(&change)
            .await
            .map_err(|source| BatchError::Listener {
                batch_id: self.batch_identifier.clone(),
                state,
                source,
            })
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn state_entered_at(&self) -> DateTime<Utc> {
        self.state_entered_at
    }

    /// Time spent in the current state so far.
    pub fn dwell(&self) -> Duration {
        (Utc::now() - self.state_entered_at)
            .to_std()
            .unwrap_or_default()
    }

    pub fn batch_number(&self) -> u64 {
        self.batch_number
    }

    pub fn total_batches(&self) -> u64 {
        self.total_batches
    }

    pub fn batch_identifier(&self) -> &str {
        &self.batch_identifier
    }

    pub fn is_last_in_group(&self) -> bool {
        self.batch_number >= self.total_batches
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Per-record handles for transformers, in batch order. Records can only
    /// be moved to a terminal state through them, never replaced or reordered.
    pub fn records_mut(&mut self) -> impl Iterator<Item = RecordMut<'_>> {
        self.records.iter_mut().map(RecordMut::new)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_with_state(&self, state: RecordState) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.state() == state)
    }

    pub fn count_with_state(&self, state: RecordState) -> usize {
        self.records_with_state(state).count()
    }

    /// Records handed to the destination, in batch order.
    pub fn transformed_records(&self) -> Vec<&Record> {
        self.records_with_state(RecordState::Transformed).collect()
    }

    /// Share of records not in `ERROR`. An empty batch counts as fully successful.
    pub fn success_ratio(&self) -> f64 {
        let total = self.records.len();
        if total == 0 {
            return 1.0;
        }
        let errors = self.count_with_state(RecordState::Error);
        (total - errors) as f64 / total as f64
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Batch")
            .field("batch_number", &self.batch_number)
            .field("total_batches", &self.total_batches)
            .field("batch_identifier", &self.batch_identifier)
            .field("state", &self.state)
            .field("state_entered_at", &self.state_entered_at)
            .field("records", &self.records.len())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(BatchState, BatchState)>>,
        fail_on: Option<BatchState>,
    }

    #[async_trait]
    impl BatchListener for Recorder {
        async fn state_changed(
            &self,
            change: &StateChange,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.seen
                .lock()
                .unwrap()
                .push((change.previous, change.state));
            if self.fail_on == Some(change.state) {
                return Err("listener refused".into());
            }
            Ok(())
        }
    }

    fn batch_of(n: usize) -> Batch {
        let mut batch = Batch::new(BatchMeta::new(1, 1), None);
        batch.add_records((0..n).map(|i| json!({ "id": i })));
        batch
    }

    #[test]
    fn add_records_preserves_order_and_starts_created() {
        let batch = batch_of(3);
        let ids: Vec<_> = batch.records().iter().map(|r| r.data()["id"].clone()).collect();
        assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
        assert_eq!(batch.count_with_state(RecordState::Created), 3);
        assert_eq!(batch.state(), BatchState::Created);
    }

    #[test]
    fn generates_identifier_when_missing() {
        let a = Batch::new(BatchMeta::new(1, 2), None);
        let b = Batch::new(BatchMeta::new(1, 2).with_identifier("page-1"), None);
        assert!(uuid::Uuid::parse_str(a.batch_identifier()).is_ok());
        assert_eq!(b.batch_identifier(), "page-1");
        assert!(!a.is_last_in_group());
        assert!(Batch::new(BatchMeta::new(2, 2), None).is_last_in_group());
    }

    #[test]
    fn transformed_records_skip_failures_but_keep_order() {
        let mut batch = batch_of(4);
        for (i, mut record) in batch.records_mut().enumerate() {
            if i == 1 {
                record.set_error("boom").unwrap();
            } else {
                let out = json!({ "out": record.data()["id"] });
                record.set_transformed_data(out).unwrap();
            }
        }

        let outs: Vec<_> = batch
            .transformed_records()
            .iter()
            .map(|r| r.transformed_data().unwrap()["out"].clone())
            .collect();
        assert_eq!(outs, vec![json!(0), json!(2), json!(3)]);
        assert_eq!(batch.len(), 4);
        assert_eq!(batch.count_with_state(RecordState::Error), 1);
        assert!((batch.success_ratio() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn record_handles_keep_order_payload_and_terminal_states() {
        let mut batch = batch_of(3);
        for mut record in batch.records_mut() {
            if record.data()["id"] == json!(0) {
                record.set_error("bad").unwrap();
            }
        }

        // A second pass cannot revive or overwrite a terminal record.
        for mut record in batch.records_mut() {
            let forged = json!({ "id": "forged" });
            match record.state() {
                RecordState::Error => {
                    assert!(record.set_transformed_data(forged).is_err());
                }
                _ => record.set_transformed_data(forged).unwrap(),
            }
        }

        let ids: Vec<_> = batch.records().iter().map(|r| r.data()["id"].clone()).collect();
        assert_eq!(ids, vec![json!(0), json!(1), json!(2)]);
        let states: Vec<_> = batch.records().iter().map(|r| r.state()).collect();
        assert_eq!(
            states,
            vec![RecordState::Error, RecordState::Transformed, RecordState::Transformed]
        );
        assert_eq!(batch.records()[0].error(), Some("bad"));
        assert!(batch.records()[0].transformed_data().is_none());
    }

    #[test]
    fn empty_batch_ratio_is_one() {
        assert_eq!(batch_of(0).success_ratio(), 1.0);
    }

    #[tokio::test]
    async fn notifies_listener_on_every_transition() {
        let recorder = Arc::new(Recorder::default());
        let mut batch = Batch::new(BatchMeta::new(1, 1), Some(recorder.clone()));

        batch.set_state(BatchState::TransformStarted).await.unwrap();
        batch.set_state(BatchState::TransformEnded).await.unwrap();
        batch.set_state(BatchState::SaveStarted).await.unwrap();
        batch.set_state(BatchState::SaveEnded).await.unwrap();

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (BatchState::Created, BatchState::TransformStarted),
                (BatchState::TransformStarted, BatchState::TransformEnded),
                (BatchState::TransformEnded, BatchState::SaveStarted),
                (BatchState::SaveStarted, BatchState::SaveEnded),
            ]
        );
    }

    #[tokio::test]
    async fn rejects_out_of_phase_and_post_error_transitions() {
        let mut batch = batch_of(1);
        let err = batch.set_state(BatchState::SaveStarted).await.unwrap_err();
        assert!(matches!(err, BatchError::InvalidTransition { .. }));
        assert_eq!(batch.state(), BatchState::Created);

        batch.set_state(BatchState::TransformStarted).await.unwrap();
        batch.set_state(BatchState::Error).await.unwrap();
        assert!(batch.set_state(BatchState::TransformEnded).await.is_err());
        assert!(batch.set_state(BatchState::Error).await.is_err());
        assert_eq!(batch.state(), BatchState::Error);
    }

    #[tokio::test]
    async fn listener_failure_propagates() {
        let recorder = Arc::new(Recorder {
            fail_on: Some(BatchState::TransformStarted),
            ..Default::default()
        });
        let mut batch = Batch::new(BatchMeta::new(1, 1), Some(recorder));

        let err = batch.set_state(BatchState::TransformStarted).await.unwrap_err();
        match err {
            BatchError::Listener { state, .. } => assert_eq!(state, BatchState::TransformStarted),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
