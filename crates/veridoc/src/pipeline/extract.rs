use serde_json::{Map, Value};

use super::context::PipelineFailure;
use super::registry::TypeDescriptor;

/// Invoke the descriptor's extraction capability and normalize its payload
/// into a field mapping.
///
/// A type with no registered capability is a distinct failure from a
/// capability that faulted; both surface as extraction failures on the
/// context, never as raw errors.
pub(crate) async fn dispatch(
    descriptor: &TypeDescriptor,
    text: &str,
) -> Result<Map<String, Value>, PipelineFailure> {
    let extractor = descriptor.extractor().ok_or_else(|| {
        PipelineFailure::extraction(format!(
            "no extraction capability registered for document type '{}'",
            descriptor.kind
        ))
    })?;

    let payload = extractor
        .extract(text)
        .await
        .map_err(|err| PipelineFailure::extraction(err.to_string()))?;

    normalize_payload(payload).map_err(PipelineFailure::extraction)
}

/// Normalize a raw capability payload:
/// - a list of candidate records keeps only the first;
/// - a record nested under a `properties` key is unwrapped;
/// - anything that is not an object afterwards is rejected.
pub(crate) fn normalize_payload(payload: Value) -> Result<Map<String, Value>, String> {
    let payload = match payload {
        Value::Array(mut items) => {
            if items.is_empty() {
                return Err("capability returned an empty record list".to_string());
            }
            items.swap_remove(0)
        }
        other => other,
    };

    let mut record = match payload {
        Value::Object(map) => map,
        other => {
            return Err(format!(
                "capability returned {} where a record object was expected",
                json_kind(&other)
            ))
        }
    };

    // Unwrap only a nested object; a scalar `properties` field is data.
    if matches!(record.get("properties"), Some(Value::Object(_))) {
        if let Some(Value::Object(inner)) = record.remove("properties") {
            return Ok(inner);
        }
    }

    Ok(record)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
