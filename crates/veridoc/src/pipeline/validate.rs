use serde_json::{Map, Value};
use tracing::debug;

use super::context::PipelineFailure;
use super::dates;
use super::geo::GeoDirectory;
use super::schema::{FieldKind, TypeSchema};

/// Run the validation stage: best-effort enrichment followed by fatal schema
/// coercion. Returns the canonical record or a validation failure; there is
/// no partial commit.
pub(crate) fn run(
    mut record: Map<String, Value>,
    schema: &TypeSchema,
    geo: &dyn GeoDirectory,
) -> Result<Map<String, Value>, PipelineFailure> {
    enrich(&mut record, geo);
    validate(record, schema)
}

/// Best-effort geographic enrichment keyed on `pin_code`.
///
/// Postal data is reference material, not structure: a malformed code, an
/// unknown code, or a missing directory entry skips enrichment without
/// touching the run's outcome.
pub(crate) fn enrich(record: &mut Map<String, Value>, geo: &dyn GeoDirectory) {
    let Some(pin_code) = record.get("pin_code") else {
        return;
    };

    let parsed = match pin_code {
        Value::String(raw) => raw.trim().parse::<u32>().ok(),
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    };

    let Some(postal_code) = parsed else {
        debug!(?pin_code, "pin_code is not a postal code, skipping enrichment");
        return;
    };

    let Some(geo_record) = geo.lookup(postal_code) else {
        debug!(postal_code, "postal code not in directory, skipping enrichment");
        return;
    };

    record.insert("state".to_string(), Value::String(geo_record.state));
    record.insert("district".to_string(), Value::String(geo_record.district.clone()));
    record.insert("circlename".to_string(), Value::String(geo_record.circle));
    record.insert("regionname".to_string(), Value::String(geo_record.region));
    record.insert("divisionname".to_string(), Value::String(geo_record.division));

    let city_missing = match record.get("city") {
        None | Some(Value::Null) => true,
        Some(Value::String(city)) => city.trim().is_empty(),
        Some(_) => false,
    };
    if city_missing {
        record.insert("city".to_string(), Value::String(geo_record.district));
    }
}

/// Coerce the record against the schema. Date fields are lenient; structural
/// violations are fatal and collected per field so the failure names every
/// offender at once.
pub(crate) fn validate(
    mut record: Map<String, Value>,
    schema: &TypeSchema,
) -> Result<Map<String, Value>, PipelineFailure> {
    let mut violations: Vec<String> = Vec::new();

    for field in schema.fields {
        let value = record.get(field.name);

        match value {
            None | Some(Value::Null) => {
                if field.required {
                    violations.push(format!("{}: required field missing", field.name));
                } else {
                    // Nullable fields end up absent, not null.
                    record.remove(field.name);
                }
                continue;
            }
            Some(present) => match field.kind {
                FieldKind::Date => {
                    let canonical = dates::canonicalize(present);
                    record.insert(field.name.to_string(), canonical);
                }
                FieldKind::Text => {
                    if !present.is_string() {
                        violations.push(format!("{}: expected a string", field.name));
                    }
                }
                FieldKind::TextList { allowed } => {
                    match coerce_text_list(present, allowed) {
                        Ok(list) => {
                            record.insert(field.name.to_string(), Value::Array(list));
                        }
                        Err(reason) => violations.push(format!("{}: {reason}", field.name)),
                    }
                }
            },
        }
    }

    if violations.is_empty() {
        Ok(record)
    } else {
        Err(PipelineFailure::validation(violations.join("; ")))
    }
}

fn coerce_text_list(
    value: &Value,
    allowed: Option<&'static [&'static str]>,
) -> Result<Vec<Value>, String> {
    let Value::Array(items) = value else {
        return Err("expected a list of strings".to_string());
    };

    let mut coerced = Vec::with_capacity(items.len());
    for item in items {
        let Value::String(raw) = item else {
            return Err("expected a list of strings".to_string());
        };
        match allowed {
            None => coerced.push(Value::String(raw.clone())),
            Some(vocabulary) => {
                let canonical = vocabulary
                    .iter()
                    .find(|candidate| candidate.eq_ignore_ascii_case(raw.trim()));
                match canonical {
                    Some(candidate) => coerced.push(Value::String((*candidate).to_string())),
                    None => return Err(format!("'{raw}' is not an accepted value")),
                }
            }
        }
    }
    Ok(coerced)
}
