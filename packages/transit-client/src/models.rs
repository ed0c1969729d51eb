use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A bus line as published by the operator.
///
/// Only `id` is interpreted; everything else is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    #[serde(deserialize_with = "text_scalar")]
    pub id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One unit's reported position on a line.
///
/// Coordinates and time are kept as the text the operator sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(deserialize_with = "text_scalar")]
    pub unidad: String,
    #[serde(deserialize_with = "text_scalar")]
    pub lat: String,
    #[serde(deserialize_with = "text_scalar")]
    pub lon: String,
    #[serde(deserialize_with = "text_scalar")]
    pub hora: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// The operator is inconsistent about quoting numbers.
fn text_scalar<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
