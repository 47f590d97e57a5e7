//! In-memory connectors used by the scenario tests.
//!
//! `ReportConnector` mimics a paginated daily report API: every day is one
//! checkpoint group and every page of that day is one batch.

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use engine_core::{
    error::SavepointError,
    retry::{RetryDisposition, RetryPolicy},
    savepoint::{SavepointManager, codec},
};
use engine_processing::{
    destination::Destination,
    error::{DestinationError, SourceError, TransformError},
    source::{SourceConnector, SourcePage},
    transform::{TransformPipeline, Transformer},
};
use model::records::{batch::Batch, state::BatchState};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::{debug, info};

pub fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Position in the report: the next day to read, how many of its pages are
/// done, and the last day (inclusive) this run covers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReportCursor {
    pub day: NaiveDate,
    pub page: u64,
    pub until: NaiveDate,
}

pub struct ReportConnector {
    rows: BTreeMap<NaiveDate, Vec<Value>>,
    page_size: usize,
    today: NaiveDate,
    outage: Option<NaiveDate>,
    pub fetches: Arc<AtomicUsize>,
}

impl ReportConnector {
    pub fn new(page_size: usize, today: NaiveDate) -> Self {
        Self {
            rows: BTreeMap::new(),
            page_size: page_size.max(1),
            today,
            outage: None,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_day(mut self, date: NaiveDate, rows: Vec<Value>) -> Self {
        self.rows.insert(date, rows);
        self
    }

    /// Every fetch for `date` fails as if the report API were down.
    pub fn with_outage(mut self, date: NaiveDate) -> Self {
        self.outage = Some(date);
        self
    }

    /// `count` rows `{ "day": .., "id": 1.. }` for `date`.
    pub fn with_rows(self, date: NaiveDate, count: usize) -> Self {
        let rows = (1..=count)
            .map(|id| json!({ "day": date.to_string(), "id": id }))
            .collect();
        self.with_day(date, rows)
    }

    fn pages_for(&self, date: NaiveDate) -> u64 {
        let rows = self.rows.get(&date).map_or(0, Vec::len);
        rows.div_ceil(self.page_size).max(1) as u64
    }

    /// Yesterday to today.
    pub fn default_cursor(&self) -> ReportCursor {
        ReportCursor {
            day: self.today - Days::new(1),
            page: 0,
            until: self.today,
        }
    }
}

#[async_trait]
impl SourceConnector for ReportConnector {
    type Savepoint = ReportCursor;

    fn name(&self) -> &str {
        "daily-report"
    }

    fn savepoint_to_string(&self, savepoint: &ReportCursor) -> Result<String, SavepointError> {
        codec::encode_json(savepoint)
    }

    fn string_to_savepoint(&self, raw: &str) -> Result<ReportCursor, SavepointError> {
        let stored: Option<ReportCursor> = codec::decode_json_or_default(raw)?;
        Ok(stored.unwrap_or_else(|| self.default_cursor()))
    }

    /// A resumed run always extends to today.
    fn start_from(&self, initial: &ReportCursor) -> ReportCursor {
        ReportCursor {
            until: initial.until.max(self.today),
            ..initial.clone()
        }
    }

    fn has_next(&self, current: &ReportCursor) -> bool {
        current.day <= current.until
    }

    async fn fetch(&mut self, current: &mut ReportCursor) -> Result<SourcePage, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let date = current.day;
        if self.outage == Some(date) {
            return Err(SourceError::Fetch {
                source_name: self.name().to_string(),
                position: format!("{date} page {}", current.page + 1),
                source: "report API unavailable".into(),
            });
        }

        let pages = self.pages_for(date);
        let page = current.page;

        let payloads: Vec<Value> = self
            .rows
            .get(&date)
            .map(|rows| {
                rows.iter()
                    .skip(page as usize * self.page_size)
                    .take(self.page_size)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if page + 1 >= pages {
            current.day = date + Days::new(1);
            current.page = 0;
        } else {
            current.page = page + 1;
        }

        Ok(SourcePage::new(payloads, page + 1, pages)
            .with_identifier(format!("report:{date}:{}/{pages}", page + 1)))
    }
}

/// Fails non-object payloads and any record carrying `"bad": true`,
/// copies the rest.
pub fn quality_check() -> TransformPipeline {
    TransformPipeline::new().add_transform(|value: &Value| {
        if !value.is_object() {
            return Err(TransformError::Transformation(format!(
                "expected an object, got {value}"
            )));
        }
        if value.get("bad").and_then(Value::as_bool) == Some(true) {
            return Err(TransformError::ValidationFailed {
                rule: "bad".to_string(),
                message: format!("record {value} flagged bad"),
            });
        }
        Ok(value.clone())
    })
}

/// Forces every batch whose identifier contains `needle` to `ERROR`.
pub struct RejectingTransformer {
    pub needle: String,
}

#[async_trait]
impl Transformer for RejectingTransformer {
    async fn transform(&self, batch: &mut Batch) -> Result<(), TransformError> {
        for mut record in batch.records_mut() {
            let out = record.data().clone();
            record.set_transformed_data(out)?;
        }
        if batch.batch_identifier().contains(&self.needle) {
            batch.set_state(BatchState::Error).await?;
        }
        Ok(())
    }
}

/// Shared view of what a [`MemoryDestination`] has done.
#[derive(Clone, Default)]
pub struct MemoryLog {
    pub rows: Arc<Mutex<Vec<Value>>>,
    pub stores: Arc<AtomicUsize>,
    pub touches: Arc<AtomicUsize>,
    pub write_attempts: Arc<AtomicUsize>,
}

impl MemoryLog {
    pub fn rows(&self) -> Vec<Value> {
        self.rows.lock().unwrap().clone()
    }

    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn touches(&self) -> usize {
        self.touches.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Accept,
    /// In-band failure: batch ends in `ERROR`.
    Conflict,
    /// Out-of-band failure: `store` returns `Err`.
    Crash,
}

/// Keeps stored rows in memory.
///
/// `outcome_for` decides per batch identifier how the write goes, and the
/// first `flaky_writes` write attempts fail transiently and are absorbed by
/// the retry policy.
pub struct MemoryDestination {
    pub log: MemoryLog,
    retry: RetryPolicy,
    flaky_writes: usize,
    outcome_for: Box<dyn Fn(&str) -> WriteOutcome + Send + Sync>,
}

impl MemoryDestination {
    pub fn new(log: MemoryLog) -> Self {
        Self {
            log,
            retry: RetryPolicy::no_retry(),
            flaky_writes: 0,
            outcome_for: Box::new(|_| WriteOutcome::Accept),
        }
    }

    pub fn with_outcome(mut self, f: impl Fn(&str) -> WriteOutcome + Send + Sync + 'static) -> Self {
        self.outcome_for = Box::new(f);
        self
    }

    pub fn with_flaky_writes(mut self, flaky_writes: usize, retry: RetryPolicy) -> Self {
        self.flaky_writes = flaky_writes;
        self.retry = retry;
        self
    }

    async fn write(&self, rows: Vec<Value>) -> Result<(), String> {
        let attempt = self.log.write_attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.flaky_writes {
            return Err(format!("transient: connection reset (attempt {})", attempt + 1));
        }
        self.log.rows.lock().unwrap().extend(rows);
        Ok(())
    }
}

#[async_trait]
impl Destination for MemoryDestination {
    fn name(&self) -> &str {
        "memory"
    }

    async fn store(&mut self, batch: &mut Batch) -> Result<(), DestinationError> {
        self.log.stores.fetch_add(1, Ordering::SeqCst);
        let batch_id = batch.batch_identifier().to_string();

        match (self.outcome_for)(&batch_id) {
            WriteOutcome::Crash => {
                return Err(DestinationError::Write {
                    destination: self.name().to_string(),
                    batch_id,
                    source: "connection refused".into(),
                });
            }
            WriteOutcome::Conflict => {
                debug!(batch_id = %batch_id, "Write conflict, rejecting batch");
                batch.set_state(BatchState::Error).await?;
                return Ok(());
            }
            WriteOutcome::Accept => {}
        }

        let rows: Vec<Value> = batch
            .transformed_records()
            .into_iter()
            .filter_map(|r| r.transformed_data().cloned())
            .collect();

        let written = self
            .retry
            .run(
                || self.write(rows.clone()),
                |e: &String| {
                    if e.starts_with("transient") {
                        RetryDisposition::Retry
                    } else {
                        RetryDisposition::Stop
                    }
                },
            )
            .await;

        match written {
            Ok(()) => batch.set_state(BatchState::SaveEnded).await?,
            Err(err) => {
                return Err(DestinationError::Write {
                    destination: self.name().to_string(),
                    batch_id,
                    source: err.into_inner().into(),
                });
            }
        }
        Ok(())
    }

    async fn touch(&mut self, batch: &mut Batch) -> Result<(), DestinationError> {
        self.log.touches.fetch_add(1, Ordering::SeqCst);
        info!(
            destination = %self.name(),
            batch_id = %batch.batch_identifier(),
            "Nothing to write"
        );
        batch.set_state(BatchState::SaveEnded).await?;
        Ok(())
    }
}

/// Savepoint manager whose `update` always fails.
pub struct BrokenSavepoints {
    pub stored: String,
}

#[async_trait]
impl SavepointManager for BrokenSavepoints {
    async fn get(&self) -> Result<String, SavepointError> {
        Ok(self.stored.clone())
    }

    async fn update(&self, _checkpoint: &str) -> Result<(), SavepointError> {
        Err(SavepointError::Update {
            pipeline: "broken".to_string(),
            source: "disk full".into(),
        })
    }
}
