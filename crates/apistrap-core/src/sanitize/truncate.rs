use serde_json::Value;

/// Replacement for strings longer than the threshold.
pub const TRUNCATED_MARKER: &str = "[[truncated]]";

/// Default maximum string length (in characters) kept in logged payloads.
pub const DEFAULT_TRUNCATION_THRESHOLD: usize = 2000;

/// Deep copy of `value` with every over-long string value replaced by
/// [`TRUNCATED_MARKER`].
///
/// Length is counted in characters and compared strictly: a string of exactly
/// `threshold` characters is kept. Object keys are never touched; key and
/// element order are preserved. Scalars other than strings pass through.
pub fn truncate_strings(value: &Value, threshold: usize) -> Value {
    match value {
        Value::String(s) if is_over(s, threshold) => Value::String(TRUNCATED_MARKER.to_owned()),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| truncate_strings(item, threshold))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_strings(v, threshold)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn is_over(s: &str, threshold: usize) -> bool {
    // Byte length bounds char count from above; skip the scan for short strings.
    s.len() > threshold && s.chars().count() > threshold
}
