//! Argument checks shared by the module stores

use reqwest::Url;
use serde_json::Value;

/// Whether `value` counts as present: not `null`, `false`, `0` or `""`
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// AdSense account IDs look like `pub-1234567890`
#[must_use]
pub fn is_valid_adsense_account_id(value: &Value) -> bool {
    value
        .as_str()
        .and_then(|id| id.strip_prefix("pub-"))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Positive integer IDs, given as a number or a string of digits
#[must_use]
pub fn is_valid_numeric_id(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_u64().is_some_and(|n| n > 0),
        Value::String(s) => {
            !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) && s.parse::<u64>().is_ok_and(|n| n > 0)
        },
        _ => false,
    }
}

/// Absolute http(s) URLs
#[must_use]
pub fn is_valid_url(value: &Value) -> bool {
    value
        .as_str()
        .and_then(|url| Url::parse(url).ok())
        .is_some_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Render an ID as it appears inside a state key: strings without quotes
#[must_use]
pub fn id_segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
