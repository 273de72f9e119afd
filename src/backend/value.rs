//! Firestore typed value codec
//!
//! The Firestore REST protocol wraps every field in a typed envelope such as
//! `{"stringValue": "x"}` or `{"integerValue": "3"}`. This module converts
//! between those envelopes and plain `serde_json::Value`, so records can be
//! (de)serialized with their ordinary serde derives.
//!
//! Timestamps are plain RFC 3339 strings on the JSON side; the encoder needs
//! to be told which top-level fields hold timestamps.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

use super::error::BackendError;

/// A document as returned by the REST API
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FirestoreDocument {
    /// Full resource name, `projects/{p}/databases/{d}/documents/{coll}/{id}`
    pub name: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
}

impl FirestoreDocument {
    /// Last path segment of the resource name
    pub fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    /// Decode the fields into plain JSON, adding the document id as `id`
    pub fn to_json_with_id(&self) -> Result<Value, BackendError> {
        let mut plain = decode_fields(&self.fields)?;
        plain.insert("id".to_string(), Value::String(self.id().to_string()));
        Ok(Value::Object(plain))
    }
}

/// Encode a plain JSON object into Firestore `fields`
pub fn encode_fields(object: &Map<String, Value>, timestamp_fields: &[&str]) -> Map<String, Value> {
    object
        .iter()
        .map(|(key, value)| {
            let encoded = match value {
                Value::String(s) if timestamp_fields.contains(&key.as_str()) => {
                    json!({ "timestampValue": s })
                }
                other => encode_value(other),
            };
            (key.clone(), encoded)
        })
        .collect()
}

/// Encode a single JSON value into its typed envelope
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // int64 travels as a decimal string
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            json!({ "mapValue": { "fields": encode_fields(map, &[]) } })
        }
    }
}

/// Decode Firestore `fields` into a plain JSON object
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, BackendError> {
    fields
        .iter()
        .map(|(key, value)| {
            decode_value(value)
                .map(|v| (key.clone(), v))
                .map_err(|e| BackendError::Decode(format!("field {key}: {e}")))
        })
        .collect()
}

/// Decode one typed envelope into plain JSON
pub fn decode_value(value: &Value) -> Result<Value, BackendError> {
    let envelope = value
        .as_object()
        .ok_or_else(|| BackendError::Decode("value is not an object".to_string()))?;

    let (kind, inner) = envelope
        .iter()
        .next()
        .ok_or_else(|| BackendError::Decode("empty value envelope".to_string()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| BackendError::Decode("booleanValue is not a bool".to_string())),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| BackendError::Decode(format!("bad integerValue {inner}")))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            // NaN and infinities have no JSON representation
            Ok(parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "timestampValue" | "stringValue" | "bytesValue" | "referenceValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| BackendError::Decode(format!("{kind} is not a string"))),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Object(fields))
        }
        other => Err(BackendError::Decode(format!("unknown value type {other}"))),
    }
}
