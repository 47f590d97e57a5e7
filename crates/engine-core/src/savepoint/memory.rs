use crate::{error::SavepointError, savepoint::SavepointManager};
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

/// Non-durable manager holding the checkpoint in memory.
///
/// Keeps every value it was asked to store, so tests and dry runs can see
/// exactly which checkpoints a run produced.
#[derive(Debug, Default)]
pub struct StaticSavepointManager {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    value: String,
    updates: Vec<String>,
}

impl StaticSavepointManager {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                value: initial.into(),
                updates: Vec::new(),
            }),
        }
    }

    pub fn current(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .value
            .clone()
    }

    pub fn updates(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .updates
            .clone()
    }

    pub fn update_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .updates
            .len()
    }
}

#[async_trait]
impl SavepointManager for StaticSavepointManager {
    async fn get(&self) -> Result<String, SavepointError> {
        Ok(self.current())
    }

    async fn update(&self, checkpoint: &str) -> Result<(), SavepointError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.value = checkpoint.to_string();
        inner.updates.push(checkpoint.to_string());
        Ok(())
    }
}
