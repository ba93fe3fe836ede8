use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FormatError;

fn malformed<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> FormatError {
    let path = err.path().to_string();
    FormatError::Malformed { path, message: err.into_inner().to_string() }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, FormatError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(malformed)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FormatError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(malformed)
}

pub fn from_value_with_path<T: DeserializeOwned>(value: &Value) -> Result<T, FormatError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        inner: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    struct Inner {
        #[allow(dead_code)]
        flag: bool,
    }

    #[test]
    fn errors_carry_the_json_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner": [{"flag": true}, {"flag": 3}]}"#).unwrap_err();
        let FormatError::Malformed { path, .. } = err else {
            panic!("expected Malformed");
        };
        assert_eq!(path, "inner[1].flag");
    }

    #[test]
    fn values_deserialize_with_path() {
        let value = serde_json::json!({"inner": [{"flag": "no"}]});
        let err = from_value_with_path::<Outer>(&value).unwrap_err();
        assert!(err.to_string().contains("inner[0].flag"));
    }
}
