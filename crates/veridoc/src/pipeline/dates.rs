use chrono::{DateTime, NaiveDate};
use serde_json::Value;

/// Accepted date notations, tried in order; the first parse wins.
///
/// The order is part of the contract: ambiguous values such as `01/02/1990`
/// resolve day-first because `%d/%m/%Y` is listed before `%m/%d/%Y`.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",  // 2024-06-25
    "%d/%m/%Y",  // 25/06/2024
    "%m/%d/%Y",  // 06/25/2024
    "%d-%m-%Y",  // 25-06-2024
    "%Y/%m/%d",  // 2024/06/25
    "%m-%d-%Y",  // 06-25-2024
    "%d %b %Y",  // 25 Jun 2024
    "%d %B %Y",  // 25 June 2024
    "%b %d, %Y", // Jun 25, 2024
    "%B %d, %Y", // June 25, 2024
    "%d.%m.%Y",  // 25.06.2024
    "%m.%d.%Y",  // 06.25.2024
    "%Y.%m.%d",  // 2024.06.25
    "%d%m%Y",    // 25062024, seen in OCR output with lost separators
    "%Y%m%d",    // 20240625
    "%d-%b-%Y",  // 25-Jun-2024
    "%d-%B-%Y",  // 25-June-2024
    "%Y %b %d",  // 2024 Jun 25
    "%Y %B %d",  // 2024 June 25
    "%b-%d-%Y",  // Jun-25-2024
    "%B-%d-%Y",  // June-25-2024
    "%b %d %Y",  // Jun 25 2024
    "%B %d %Y",  // June 25 2024
    "%d/%b/%Y",  // 25/Jun/2024
    "%d/%B/%Y",  // 25/June/2024
];

/// Canonicalize a raw extracted value into `YYYY-MM-DD` where possible.
///
/// Strings that match no known notation come back unchanged; this is the
/// lenient half of validation and never fails a run on its own. Integers are
/// treated as Unix timestamps.
pub(crate) fn canonicalize(value: &Value) -> Value {
    match value {
        Value::String(raw) => match canonicalize_str(raw) {
            Some(date) => Value::String(date),
            None => value.clone(),
        },
        Value::Number(number) => match number.as_i64().and_then(from_timestamp) {
            Some(date) => Value::String(date),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

fn canonicalize_str(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }

    None
}

fn from_timestamp(seconds: i64) -> Option<String> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.date_naive().format("%Y-%m-%d").to_string())
}
