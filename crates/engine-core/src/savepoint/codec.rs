//! JSON helpers for sources whose checkpoint is a structured value.

use crate::error::SavepointError;
use serde::{Serialize, de::DeserializeOwned};

pub fn encode_json<T: Serialize>(savepoint: &T) -> Result<String, SavepointError> {
    serde_json::to_string(savepoint).map_err(|e| SavepointError::Encode(e.to_string()))
}

/// Decodes `raw`, falling back to `T::default()` when there is no prior checkpoint.
pub fn decode_json_or_default<T>(raw: &str) -> Result<T, SavepointError>
where
    T: DeserializeOwned + Default,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(raw).map_err(|e| SavepointError::Decode {
        raw: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
    struct RowRange {
        from_id: u64,
        to_id: u64,
    }

    #[test]
    fn empty_string_is_default() {
        let range: RowRange = decode_json_or_default("").unwrap();
        assert_eq!(range, RowRange::default());
        let range: RowRange = decode_json_or_default("   ").unwrap();
        assert_eq!(range, RowRange::default());
    }

    #[test]
    fn encodes_and_decodes_structured_value() {
        let raw = encode_json(&RowRange { from_id: 10, to_id: 20 }).unwrap();
        assert_eq!(raw, r#"{"from_id":10,"to_id":20}"#);
        let back: RowRange = decode_json_or_default(&raw).unwrap();
        assert_eq!(back, RowRange { from_id: 10, to_id: 20 });
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode_json_or_default::<RowRange>("not json").unwrap_err();
        assert!(matches!(err, SavepointError::Decode { .. }));
    }
}
