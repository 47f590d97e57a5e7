use crate::{
    error::SavepointError,
    savepoint::{
        SavepointManager,
        models::{SavepointLogEntry, SavepointRecord},
    },
};
use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::debug;

/// Durable savepoint manager backed by sled, one key per pipeline.
///
/// Each update writes the latest record and an audit entry in a single
/// transaction, then flushes before acknowledging.
pub struct SledSavepointManager {
    db: sled::Db,
    pipeline: String,
}

impl SledSavepointManager {
    pub fn open(path: impl AsRef<Path>, pipeline: impl Into<String>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self::with_db(db, pipeline))
    }

    /// Shares an already opened database, e.g. between several pipelines.
    pub fn with_db(db: sled::Db, pipeline: impl Into<String>) -> Self {
        Self {
            db,
            pipeline: pipeline.into(),
        }
    }

    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    #[inline]
    fn savepoint_key(pipeline: &str) -> String {
        format!("sp:{pipeline}")
    }

    /// The name is length-prefixed so `orders` never matches `orders:eu`.
    #[inline]
    fn log_prefix(pipeline: &str) -> String {
        format!("splog:{}:{pipeline}:", pipeline.len())
    }

    /// Zero padded so lexical order in sled matches write order.
    #[inline]
    fn log_key(pipeline: &str, seq: u64) -> String {
        format!("{}{seq:020}", Self::log_prefix(pipeline))
    }

    fn load_error(&self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> SavepointError {
        SavepointError::Load {
            pipeline: self.pipeline.clone(),
            source: source.into(),
        }
    }

    fn update_error(
        &self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> SavepointError {
        SavepointError::Update {
            pipeline: self.pipeline.clone(),
            source: source.into(),
        }
    }

    /// Full record of the latest checkpoint, if one was ever written.
    pub fn record(&self) -> Result<Option<SavepointRecord>, SavepointError> {
        let key = Self::savepoint_key(&self.pipeline);
        match self.db.get(key).map_err(|e| self.load_error(e))? {
            Some(bytes) => {
                let record = bincode::deserialize(&bytes).map_err(|e| self.load_error(e))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Every checkpoint this pipeline has written, oldest first.
    pub fn history(&self) -> Result<Vec<SavepointLogEntry>, SavepointError> {
        let mut entries = Vec::new();
        for item in self.db.scan_prefix(Self::log_prefix(&self.pipeline)) {
            let (_key, value) = item.map_err(|e| SavepointError::History(e.to_string()))?;
            let entry: SavepointLogEntry = bincode::deserialize(&value)
                .map_err(|e| SavepointError::History(e.to_string()))?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[async_trait]
impl SavepointManager for SledSavepointManager {
    async fn get(&self) -> Result<String, SavepointError> {
        Ok(self
            .record()?
            .map(|record| record.checkpoint)
            .unwrap_or_default())
    }

    async fn update(&self, checkpoint: &str) -> Result<(), SavepointError> {
        let previous = self.get().await?;
        let seq = self.db.generate_id().map_err(|e| self.update_error(e))?;
        let now = chrono::Utc::now();

        let record = SavepointRecord {
            pipeline: self.pipeline.clone(),
            checkpoint: checkpoint.to_string(),
            updated_at: now,
        };
        let entry = SavepointLogEntry {
            pipeline: self.pipeline.clone(),
            seq,
            previous,
            checkpoint: checkpoint.to_string(),
            at: now,
        };

        let record_bytes = bincode::serialize(&record).map_err(|e| self.update_error(e))?;
        let entry_bytes = bincode::serialize(&entry).map_err(|e| self.update_error(e))?;
        let key = Self::savepoint_key(&self.pipeline);
        let log_key = Self::log_key(&self.pipeline, seq);

        let result = self
            .db
            .transaction::<_, _, ()>(|tx_db| {
                tx_db.insert(key.as_bytes(), record_bytes.as_slice())?;
                tx_db.insert(log_key.as_bytes(), entry_bytes.as_slice())?;
                Ok::<_, ConflictableTransactionError<()>>(())
            });

        match result {
            Ok(()) => {}
            Err(TransactionError::Storage(e)) => return Err(self.update_error(e)),
            Err(TransactionError::Abort(())) => {
                return Err(self.update_error("savepoint transaction aborted"));
            }
        }

        self.db
            .flush_async()
            .await
            .map_err(|e| self.update_error(e))?;

        debug!(pipeline = %self.pipeline, seq, "Savepoint persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_key_reads_as_empty() {
        let dir = tempdir().unwrap();
        let manager = SledSavepointManager::open(dir.path(), "orders").unwrap();

        assert_eq!(manager.get().await.unwrap(), "");
        assert!(manager.record().unwrap().is_none());
        assert!(manager.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let manager = SledSavepointManager::open(dir.path(), "orders").unwrap();
            manager.update(r#"{"page":1}"#).await.unwrap();
            manager.update(r#"{"page":2}"#).await.unwrap();
        }

        let manager = SledSavepointManager::open(dir.path(), "orders").unwrap();
        assert_eq!(manager.get().await.unwrap(), r#"{"page":2}"#);

        let history = manager.history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].previous, "");
        assert_eq!(history[0].checkpoint, r#"{"page":1}"#);
        assert_eq!(history[1].previous, r#"{"page":1}"#);
        assert!(history[0].seq < history[1].seq);
    }

    #[tokio::test]
    async fn pipelines_do_not_share_checkpoints() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let orders = SledSavepointManager::with_db(db.clone(), "orders");
        let invoices = SledSavepointManager::with_db(db, "invoices");

        orders.update("42").await.unwrap();

        assert_eq!(orders.get().await.unwrap(), "42");
        assert_eq!(invoices.get().await.unwrap(), "");
        assert!(invoices.history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_ignores_pipelines_sharing_a_name_prefix() {
        let dir = tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let orders = SledSavepointManager::with_db(db.clone(), "orders");
        let orders_eu = SledSavepointManager::with_db(db, "orders:eu");

        orders_eu.update("eu-1").await.unwrap();
        orders.update("all-1").await.unwrap();

        let history = orders.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].pipeline, "orders");
        assert_eq!(history[0].checkpoint, "all-1");

        let history = orders_eu.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].checkpoint, "eu-1");
        assert_eq!(orders.get().await.unwrap(), "all-1");
    }
}
