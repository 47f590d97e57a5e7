use crate::records::{error::RecordError, state::RecordState};
use serde::Serialize;
use serde_json::Value;

/// One logical input item and, once transformed, its output payload.
///
/// `data` is fixed at construction. The transformer moves the record to a
/// terminal state exactly once; later mutations are rejected.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    state: RecordState,
    data: Value,
    transformed_data: Option<Value>,
    error: Option<String>,
}

impl Record {
    pub fn new(data: Value) -> Self {
        Record {
            state: RecordState::Created,
            data,
            transformed_data: None,
            error: None,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn transformed_data(&self) -> Option<&Value> {
        self.transformed_data.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Attaches the transformed payload and marks the record `TRANSFORMED`.
    pub fn set_transformed_data(&mut self, transformed: Value) -> Result<(), RecordError> {
        self.ensure_open()?;
        self.transformed_data = Some(transformed);
        self.state = RecordState::Transformed;
        Ok(())
    }

    /// Marks the record `ERROR`, keeping it in its batch for audit.
    pub fn set_error(&mut self, error: impl Into<String>) -> Result<(), RecordError> {
        self.ensure_open()?;
        self.error = Some(error.into());
        self.state = RecordState::Error;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), RecordError> {
        if self.state.is_terminal() {
            return Err(RecordError::AlreadyTerminal(self.state));
        }
        Ok(())
    }
}

/// Write access to one record during transformation.
///
/// Exposes only the terminal transitions. The record cannot be replaced,
/// moved or have its `data` rewritten through it.
#[derive(Debug)]
pub struct RecordMut<'a> {
    record: &'a mut Record,
}

impl<'a> RecordMut<'a> {
    pub(crate) fn new(record: &'a mut Record) -> Self {
        Self { record }
    }

    pub fn state(&self) -> RecordState {
        self.record.state()
    }

    pub fn data(&self) -> &Value {
        self.record.data()
    }

    pub fn set_transformed_data(&mut self, transformed: Value) -> Result<(), RecordError> {
        self.record.set_transformed_data(transformed)
    }

    pub fn set_error(&mut self, error: impl Into<String>) -> Result<(), RecordError> {
        self.record.set_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transformed_data_keeps_raw_payload() {
        let mut record = Record::new(json!({ "id": 1 }));
        record
            .set_transformed_data(json!({ "id": 1, "seen": true }))
            .unwrap();

        assert_eq!(record.state(), RecordState::Transformed);
        assert_eq!(record.data(), &json!({ "id": 1 }));
        assert_eq!(
            record.transformed_data(),
            Some(&json!({ "id": 1, "seen": true }))
        );
        assert!(record.error().is_none());
    }

    #[test]
    fn terminal_record_rejects_further_changes() {
        let mut record = Record::new(json!("raw"));
        record.set_error("bad date").unwrap();

        let err = record.set_transformed_data(json!("late")).unwrap_err();
        assert_eq!(err, RecordError::AlreadyTerminal(RecordState::Error));
        assert_eq!(record.state(), RecordState::Error);
        assert_eq!(record.error(), Some("bad date"));
        assert!(record.transformed_data().is_none());

        let mut done = Record::new(json!(1));
        done.set_transformed_data(json!(2)).unwrap();
        assert!(done.set_error("too late").is_err());
        assert_eq!(done.state(), RecordState::Transformed);
    }
}
