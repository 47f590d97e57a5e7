use crate::error::SavepointError;
use async_trait::async_trait;

pub mod codec;
pub mod memory;
pub mod models;
pub mod sled_store;

/// Durable home of a pipeline's opaque checkpoint string.
///
/// The manager never interprets the value. An empty string from `get` means
/// there is no prior checkpoint. There is no coupling with the data
/// destination: callers only `update` once the matching data is known to be
/// stored.
#[async_trait]
pub trait SavepointManager: Send + Sync {
    async fn get(&self) -> Result<String, SavepointError>;
    async fn update(&self, checkpoint: &str) -> Result<(), SavepointError>;
}
