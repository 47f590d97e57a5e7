use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single record inside a batch.
///
/// A record leaves `Created` exactly once, when the transformer either
/// attaches its output (`Transformed`) or rejects it (`Error`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    Created,
    Transformed,
    Error,
}

impl RecordState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RecordState::Transformed | RecordState::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordState::Created => "CREATED",
            RecordState::Transformed => "TRANSFORMED",
            RecordState::Error => "ERROR",
        }
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a batch, driven phase by phase by the runner.
///
/// ```text
/// CREATED -> TRANSFORM_STARTED -> TRANSFORM_ENDED -> SAVE_STARTED -> SAVE_ENDED
///     \              \                  \                 \
///      +--------------+------------------+-----------------+--> ERROR
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    Created,
    TransformStarted,
    TransformEnded,
    SaveStarted,
    SaveEnded,
    Error,
}

impl BatchState {
    /// `SaveEnded` and `Error` are final; nothing moves a batch out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::SaveEnded | BatchState::Error)
    }

    pub fn can_transition_to(&self, next: BatchState) -> bool {
        use BatchState::*;
        match (self, next) {
            (SaveEnded, _) | (Error, _) => false,
            (_, Error) => true,
            (Created, TransformStarted) => true,
            (TransformStarted, TransformEnded) => true,
            (TransformEnded, SaveStarted) => true,
            (SaveStarted, SaveEnded) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Created => "CREATED",
            BatchState::TransformStarted => "TRANSFORM_STARTED",
            BatchState::TransformEnded => "TRANSFORM_ENDED",
            BatchState::SaveStarted => "SAVE_STARTED",
            BatchState::SaveEnded => "SAVE_ENDED",
            BatchState::Error => "ERROR",
        }
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
