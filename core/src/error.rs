//! Error types for store construction and action creation

use serde_json::{Value, json};
use thiserror::Error;

/// Errors raised while building or combining store fragments, or by
/// action creators that refuse malformed input.
///
/// All of these are programmer errors: they surface at wiring time (or on a
/// direct, deliberate call) and are never recovered from inside the data layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A fetch descriptor was created with an empty base name
    #[error("baseName is required.")]
    MissingBaseName,

    /// A fetch descriptor has no request issuer
    #[error("issueRequest is required and must be a function.")]
    MissingIssueRequest,

    /// Two or more collections passed to `collect()` share keys
    #[error(
        "{caller}() cannot accept collections with duplicate keys. Your call to {caller}() contains the following duplicated functions: {}.",
        .keys.join(", ")
    )]
    DuplicateKeys {
        /// Name of the collecting function
        caller: &'static str,
        /// Every duplicated key, each listed once
        keys: Vec<String>,
    },

    /// `collect_name()` received differing (or no) store names
    #[error("collectName() must not receive different names.")]
    DifferentNames,

    /// A receive action was created without a response
    #[error("response is required.")]
    ResponseRequired,

    /// A receive action was created without a params object although the
    /// descriptor requires one
    #[error("params is required.")]
    ParamsRequired,

    /// An action creator rejected its arguments
    #[error(transparent)]
    InvalidArgs(#[from] ArgsError),
}

/// Argument validation failure reported by an argument normalizer.
///
/// The message is shown verbatim to developers, e.g. `"accountID is required."`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ArgsError {
    message: String,
}

impl ArgsError {
    /// Error code carried by the JSON form of this error
    pub const CODE: &'static str = "invalid_args";

    /// Create a new argument error with the given message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human readable message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// JSON form used when the error is handed back through a fetch outcome
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "code": Self::CODE, "message": self.message })
    }
}

/// Fail with `message` unless `condition` holds.
///
/// Intended for argument normalizers:
///
/// ```
/// use sitekit_data_core::error::require;
///
/// let account_id = "pub-123";
/// assert!(require(!account_id.is_empty(), "accountID is required.").is_ok());
/// assert_eq!(
///     require(false, "accountID is required.").unwrap_err().message(),
///     "accountID is required."
/// );
/// ```
///
/// # Errors
///
/// Returns [`ArgsError`] carrying `message` when `condition` is false.
pub fn require(condition: bool, message: &str) -> Result<(), ArgsError> {
    if condition {
        Ok(())
    } else {
        Err(ArgsError::new(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_keys_message_lists_every_key() {
        let err = StoreError::DuplicateKeys {
            caller: "collect",
            keys: vec!["cat".to_string(), "feline".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "collect() cannot accept collections with duplicate keys. Your call to collect() contains the following duplicated functions: cat, feline."
        );
    }

    #[test]
    fn args_error_json_form() {
        let err = ArgsError::new("objParam is required.");
        assert_eq!(
            err.to_value(),
            json!({ "code": "invalid_args", "message": "objParam is required." })
        );
        assert_eq!(StoreError::from(err).to_string(), "objParam is required.");
    }
}
