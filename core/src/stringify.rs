//! Canonical, key-order independent serialization
//!
//! Used to key in-flight tracking maps by parameter set.

use crate::action::Params;
use serde_json::{Map, Value};

/// Serialize `value` as JSON with every object's keys sorted, recursively.
///
/// Two values that are deeply equal produce the same string regardless of
/// the insertion order of their keys. Array order is significant.
#[must_use]
pub fn stringify_object(value: &Value) -> String {
    sorted(value).to_string()
}

/// Canonical key for a parameter object
#[must_use]
pub fn stringify_params(params: &Params) -> String {
    let mut keys: Vec<&String> = params.keys().collect();
    keys.sort();

    let mut out = Map::new();
    for key in keys {
        if let Some(value) = params.get(key) {
            out.insert(key.clone(), sorted(value));
        }
    }
    Value::Object(out).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut out = Map::new();
            for key in keys {
                if let Some(inner) = map.get(key) {
                    out.insert(key.clone(), sorted(inner));
                }
            }
            Value::Object(out)
        },
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
