use std::collections::HashSet;

use serde_json::Value;

/// Replacement for values of sensitive fields.
pub const MASKED_MARKER: &str = "***MASKED***";

/// Field names masked when nothing else is configured.
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "auth",
    "credential",
    "private_key",
    "access_token",
    "refresh_token",
];

/// Case-insensitive set of field names whose values must never be logged.
#[derive(Debug, Clone)]
pub struct SensitiveFields {
    names: HashSet<String>,
}

impl Default for SensitiveFields {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVE_FIELDS.iter().copied())
    }
}

impl SensitiveFields {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names.into_iter().map(|n| n.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.names.contains(&key.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Deep copy of `value` where the value of every object key found in
/// `fields` is replaced by [`MASKED_MARKER`], whatever its type.
pub fn mask_sensitive(value: &Value, fields: &SensitiveFields) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = if fields.contains(k) {
                        Value::String(MASKED_MARKER.to_owned())
                    } else {
                        mask_sensitive(v, fields)
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|item| mask_sensitive(item, fields)).collect()),
        other => other.clone(),
    }
}
