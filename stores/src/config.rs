//! REST API client configuration and the site's bootstrap data

use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the site's base URL
pub const ENV_BASE_URL: &str = "SITEKIT_API_BASE_URL";

/// Environment variable holding the REST nonce
pub const ENV_NONCE: &str = "SITEKIT_API_NONCE";

/// Environment variable holding the request timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "SITEKIT_API_TIMEOUT_SECS";

/// Environment variable holding the site's base data as a JSON object
pub const ENV_BASE_DATA: &str = "SITEKIT_BASE_DATA";

/// Environment variable holding the current entity's data as a JSON object
pub const ENV_ENTITY_DATA: &str = "SITEKIT_ENTITY_DATA";

/// Errors raised while loading [`ApiConfig`] or building a client from it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("{0} is required")]
    Missing(&'static str),

    /// The base URL is not an http(s) URL
    #[error("Invalid base URL {0:?}: expected an http:// or https:// URL")]
    InvalidBaseUrl(String),

    /// The timeout is not a positive whole number of seconds
    #[error("Invalid timeout {0:?}: expected a positive number of seconds")]
    InvalidTimeout(String),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// Bootstrap data is not a JSON object
    #[error("Invalid {var}: {message}")]
    InvalidBootstrap {
        /// The offending variable
        var: &'static str,
        /// Why it was rejected
        message: String,
    },
}

/// Where and how to reach the Site Kit REST API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Site URL without a trailing slash, e.g. `https://example.com/wp-json`
    pub base_url: String,
    /// Value of the `X-WP-Nonce` header, if any
    pub nonce: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    /// Timeout used when none is configured
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Configuration for `base_url` with no nonce and the default timeout
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] unless `base_url` is http(s).
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            nonce: None,
            timeout: Self::DEFAULT_TIMEOUT,
        })
    }

    /// Set the nonce
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Set the timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] if the base URL is not set
    /// - [`ConfigError::InvalidBaseUrl`] / [`ConfigError::InvalidTimeout`] for
    ///   malformed values
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let base_url = read(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let mut config = Self::new(&base_url)?;

        if let Some(nonce) = read(ENV_NONCE) {
            config = config.with_nonce(nonce.trim());
        }

        if let Some(raw) = read(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(raw.clone()))?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

/// Site and entity info the page was rendered with.
///
/// Seeds the `core/site` info selectors. Both halves must be present for
/// the info to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteBootstrap {
    /// `adminURL`, `ampMode`, `homeURL`, `referenceSiteURL`, `siteName`,
    /// `timezone`, `usingProxy`
    pub base_data: Option<Map<String, Value>>,
    /// `currentEntityURL`, `currentEntityType`, `currentEntityTitle`,
    /// `currentEntityID`
    pub entity_data: Option<Map<String, Value>>,
}

impl SiteBootstrap {
    /// Bootstrap data from both halves
    #[must_use]
    pub const fn new(base_data: Map<String, Value>, entity_data: Map<String, Value>) -> Self {
        Self {
            base_data: Some(base_data),
            entity_data: Some(entity_data),
        }
    }

    /// Load from the process environment
    ///
    /// # Errors
    ///
    /// See [`SiteBootstrap::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables. Unset halves stay `None`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBootstrap`] if a variable is not a JSON object.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &'static str| -> Result<Option<Map<String, Value>>, ConfigError> {
            let Some(raw) = lookup(var).filter(|value| !value.trim().is_empty()) else {
                return Ok(None);
            };
            match serde_json::from_str(&raw) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(_) => Err(ConfigError::InvalidBootstrap {
                    var,
                    message: "expected a JSON object".to_string(),
                }),
                Err(e) => Err(ConfigError::InvalidBootstrap {
                    var,
                    message: e.to_string(),
                }),
            }
        };

        Ok(Self {
            base_data: read(ENV_BASE_DATA)?,
            entity_data: read(ENV_ENTITY_DATA)?,
        })
    }

    /// Both halves merged into one object, or `None` unless both are present
    #[must_use]
    pub fn site_info(&self) -> Option<Value> {
        let (Some(base), Some(entity)) = (&self.base_data, &self.entity_data) else {
            return None;
        };

        let mut info = base.clone();
        info.extend(entity.clone());
        Some(Value::Object(info))
    }
}
