use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::backend::{Document, Fields, StoreError};

/// Decodes every well-formed document into `T`, skipping the rest.
///
/// The document id is injected as the `id` field before decoding.
pub(crate) fn decode_all<T: DeserializeOwned>(documents: &[Document]) -> Vec<T> {
    documents
        .iter()
        .filter_map(|document| match decode(document) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(id = %document.id, error = %err, "skipping malformed document");
                None
            }
        })
        .collect()
}

pub(crate) fn decode<T: DeserializeOwned>(document: &Document) -> Result<T, serde_json::Error> {
    let mut fields = document.fields.clone();
    fields.insert(
        "id".to_string(),
        serde_json::Value::String(document.id.0.clone()),
    );
    serde_json::from_value(serde_json::Value::Object(fields))
}

/// Reads an optional date-like field without failing the document.
///
/// Absent, null, and non-string values read as `None`; strings that `parse`
/// rejects are logged and also read as `None`.
pub(crate) fn lenient_field<'de, D, T>(
    deserializer: D,
    field: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(raw)) => raw,
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(other) => {
            warn!(field, value = %other, "ignoring non-text value");
            return Ok(None);
        }
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(field, value = raw.as_str(), "ignoring unparseable value");
    }
    Ok(parsed)
}

/// Serializes a record into the field map written to the store.
pub(crate) fn encode<T: Serialize>(record: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Encoding(serde::ser::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}
