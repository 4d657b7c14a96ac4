//! Payload redaction
//!
//! Keys are compared after lower-casing and stripping `_`, `-` and spaces,
//! so `apiKey`, `api_key` and `API-KEY` all hit the same entry.

use serde::Serialize;
use serde_json::{Map, Value};

/// Replacement written in place of a redacted value
pub const REDACTED: &str = "[REDACTED]";

/// Marker stored when a payload could not be turned into JSON
pub const UNSERIALIZABLE: &str = "[UNSERIALIZABLE]";

const EXACT_KEYS: &[&str] = &[
    "apikey",
    "password",
    "secret",
    "token",
    "authorization",
    "accesstoken",
    "refreshtoken",
    "bearer",
];

const SUFFIX_KEYS: &[&str] = &["apikey", "secret", "password"];

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether a field name must never be logged in clear
pub fn is_sensitive_key(key: &str) -> bool {
    let key = normalize(key);
    EXACT_KEYS.contains(&key.as_str()) || SUFFIX_KEYS.iter().any(|s| key.ends_with(s))
}

/// Serialize `data` and redact every sensitive key, at any depth.
///
/// Returns `None` when the payload cannot be represented as JSON
/// (e.g. a map with non-string keys); callers record the event without data.
pub fn sanitize<T: Serialize + ?Sized>(data: &T) -> Option<Value> {
    serde_json::to_value(data).ok().map(redact_value)
}

fn redact_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let redacted: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| {
                    if is_sensitive_key(&k) {
                        (k, Value::String(REDACTED.to_string()))
                    } else {
                        (k, redact_value(v))
                    }
                })
                .collect();
            Value::Object(redacted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(redact_value).collect()),
        other => other,
    }
}

/// Replace every occurrence of `secret` inside free text.
///
/// Error messages from HTTP clients sometimes echo request URLs or headers;
/// this keeps a known key value out of them. Any non-empty secret is
/// replaced, however short.
pub fn redact_secret(text: &str, secret: &str) -> String {
    if secret.is_empty() || !text.contains(secret) {
        return text.to_string();
    }
    text.replace(secret, REDACTED)
}
