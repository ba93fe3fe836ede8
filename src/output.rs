//! Validator output as it arrives on the wire.
//!
//! Flat (`basic`), pruned (`detailed`) and full (`verbose`) trees all share
//! this node shape; fields other than the four below are ignored.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FormatError;
use crate::path_de;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputUnit>,
}

impl OutputUnit {
    pub fn from_value(value: &Value) -> Result<Self, FormatError> {
        path_de::from_value_with_path(value)
    }

    pub fn from_json_str(src: &str) -> Result<Self, FormatError> {
        path_de::from_str_with_path(src)
    }

    pub fn is_valid(&self) -> bool {
        self.valid == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_units_and_ignores_extras() {
        let output = OutputUnit::from_value(&json!({
            "valid": false,
            "errors": [{
                "valid": false,
                "keywordLocation": "/minLength",
                "absoluteKeywordLocation": "https://example.com/main#/minLength",
                "instanceLocation": "",
                "error": "too short",
                "keyword": "minLength"
            }]
        }))
        .unwrap();
        assert_eq!(output.valid, Some(false));
        assert_eq!(output.errors[0].instance_location.as_deref(), Some(""));
        assert!(output.errors[0].errors.is_empty());
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = OutputUnit::from_value(&json!({"valid": false, "errors": [{"instanceLocation": 3}]}))
            .unwrap_err();
        assert!(matches!(err, FormatError::Malformed { ref path, .. } if path == "errors[0].instanceLocation"));
    }
}
