//! Restart scenarios against a durable sled store.

#[cfg(test)]
mod tests {
    use crate::connectors::{
        MemoryDestination, MemoryLog, ReportConnector, ReportCursor, WriteOutcome, day,
    };
    use chrono::{Days, NaiveDate};
    use engine_config::settings::PipelineSettings;
    use engine_core::savepoint::sled_store::SledSavepointManager;
    use engine_processing::{source::SavepointedSource, transform::TransformPipeline};
    use engine_runtime::{
        error::RunError,
        execution::{Pipeline, RunSummary, execute},
    };
    use serde_json::Value;
    use std::{path::Path, sync::Arc};
    use tempfile::tempdir;

    const PIPELINE: &str = "daily-report";

    fn today() -> NaiveDate {
        day("2024-03-10")
    }

    fn yesterday() -> NaiveDate {
        today() - Days::new(1)
    }

    fn connector() -> ReportConnector {
        ReportConnector::new(2, today())
            .with_rows(yesterday(), 6)
            .with_rows(today(), 3)
    }

    fn encoded(day: NaiveDate) -> String {
        serde_json::to_string(&ReportCursor {
            day,
            page: 0,
            until: today(),
        })
        .unwrap()
    }

    fn rows_for(rows: &[Value], date: NaiveDate) -> usize {
        let date = date.to_string();
        rows.iter()
            .filter(|row| row["day"].as_str() == Some(date.as_str()))
            .count()
    }

    /// One run in its own "process": the store is opened and closed around it.
    async fn run_once(
        path: &Path,
        destination: MemoryDestination,
    ) -> Result<RunSummary, RunError> {
        let savepoints = Arc::new(SledSavepointManager::open(path, PIPELINE).unwrap());
        let pipeline = Pipeline::new(
            SavepointedSource::new(connector()),
            TransformPipeline::new(),
            destination,
            savepoints,
        );
        let settings = PipelineSettings::new(PIPELINE);
        execute(pipeline, &settings).await
    }

    fn crash_on(prefix: String) -> impl Fn(&str) -> WriteOutcome + Send + Sync + 'static {
        move |id| {
            if id.starts_with(&prefix) {
                WriteOutcome::Crash
            } else {
                WriteOutcome::Accept
            }
        }
    }

    #[tokio::test]
    async fn restart_resumes_from_last_completed_group() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("savepoints");

        let first = MemoryLog::default();
        let destination = MemoryDestination::new(first.clone())
            .with_outcome(crash_on(format!("report:{}", today())));
        assert!(run_once(&path, destination).await.is_err());
        assert_eq!(rows_for(&first.rows(), yesterday()), 6);

        let second = MemoryLog::default();
        let summary = run_once(&path, MemoryDestination::new(second.clone()))
            .await
            .unwrap();

        // Yesterday is not written again.
        assert_eq!(rows_for(&second.rows(), yesterday()), 0);
        assert_eq!(rows_for(&second.rows(), today()), 3);
        assert_eq!(summary.metrics.batches_fetched, 2);

        let store = SledSavepointManager::open(&path, PIPELINE).unwrap();
        let record = store.record().unwrap().unwrap();
        assert_eq!(record.checkpoint, encoded(today() + Days::new(1)));

        let history = store.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].previous, "");
        assert_eq!(history[0].checkpoint, encoded(today()));
        assert_eq!(history[1].previous, history[0].checkpoint);
        assert!(history[0].seq < history[1].seq);
    }

    #[tokio::test]
    async fn failure_inside_a_group_replays_the_whole_group() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("savepoints");

        let first = MemoryLog::default();
        let destination = MemoryDestination::new(first.clone())
            .with_outcome(crash_on(format!("report:{}:2/3", yesterday())));
        assert!(run_once(&path, destination).await.is_err());
        assert_eq!(first.rows().len(), 2);

        {
            let store = SledSavepointManager::open(&path, PIPELINE).unwrap();
            assert!(store.record().unwrap().is_none());
        }

        let second = MemoryLog::default();
        run_once(&path, MemoryDestination::new(second.clone()))
            .await
            .unwrap();

        // Page 1 of yesterday is delivered twice across the two runs.
        assert_eq!(rows_for(&second.rows(), yesterday()), 6);
        assert_eq!(rows_for(&second.rows(), today()), 3);
    }
}
