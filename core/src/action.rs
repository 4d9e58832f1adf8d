//! Actions, state and parameter types
//!
//! State and parameters are plain JSON objects. A missing key (or `null`)
//! is how "not loaded yet" is represented.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The state held by a registered store
pub type State = Map<String, Value>;

/// Canonical parameter object produced by an argument normalizer
pub type Params = Map<String, Value>;

/// A plain state-transition record.
///
/// Serializes as `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Action type, e.g. `START_FETCH_GET_SOME_DATA`
    #[serde(rename = "type")]
    pub kind: String,

    /// Arbitrary payload, an object for every action created by this crate
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    /// Create an action with the given type and payload
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create an action with an empty object payload
    #[must_use]
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Object(Map::new()))
    }

    /// Look up a member of the payload object
    #[must_use]
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// The `params` member of the payload, or an empty object when missing
    #[must_use]
    pub fn params(&self) -> Params {
        self.payload_field("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

/// Fetch a state member, treating a missing key as `null`
#[must_use]
pub fn state_value(state: &State, key: &str) -> Value {
    state.get(key).cloned().unwrap_or(Value::Null)
}
