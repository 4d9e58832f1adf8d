//! `Api` implementation over HTTP
//!
//! Requests go to `{base_url}/google-site-kit/v1/{kind}/{identifier}/data/{datapoint}`.
//! Reads send their data as the query string; writes are `POST`ed with a
//! `{"data": ...}` JSON body. Front-end pages are fetched directly, with
//! `tagverify=1` and a cache-busting `timestamp`.

use crate::config::{ApiConfig, ConfigError};
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::{Value, json};
use sitekit_data_core::{Api, ApiMethod, ApiRequest, Params};
use std::time::{SystemTime, UNIX_EPOCH};

/// REST namespace of the Site Kit API
pub const API_NAMESPACE: &str = "google-site-kit/v1";

/// Site Kit REST API client
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    config: ApiConfig,
}

impl HttpApi {
    /// Create a client for `config`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClient`] if the TLS backend cannot be
    /// initialized.
    pub fn new(config: ApiConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create a client configured from the environment
    ///
    /// # Errors
    ///
    /// See [`ApiConfig::from_env`] and [`HttpApi::new`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Full URL for `request`
    #[must_use]
    pub fn url(&self, request: &ApiRequest) -> String {
        format!("{}/{API_NAMESPACE}/{}", self.config.base_url, request.path())
    }
}

impl Api for HttpApi {
    fn call(&self, request: ApiRequest) -> BoxFuture<'static, Result<Value, Value>> {
        let url = self.url(&request);
        let mut builder = match request.method {
            ApiMethod::Get => self.client.get(&url).query(&query_pairs(&request.data)),
            ApiMethod::Set => self.client.post(&url).json(&json!({ "data": request.data })),
        };
        if let Some(nonce) = &self.config.nonce {
            builder = builder.header("X-WP-Nonce", nonce);
        }

        tracing::debug!(method = %request.method, url = %url, "api request");

        Box::pin(async move {
            let response = builder.send().await.map_err(|e| fetch_error(&e))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| fetch_error(&e))?;

            let result = decode_response(status, &body);
            if let Err(error) = &result {
                tracing::debug!(url = %url, status, error = %error, "api request failed");
            }
            result
        })
    }

    fn fetch_page(&self, url: &str) -> BoxFuture<'static, Result<Value, Value>> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis());
        let builder = self
            .client
            .get(url)
            .query(&[("tagverify", "1".to_string()), ("timestamp", timestamp.to_string())]);

        tracing::debug!(url, "page request");
        let url = url.to_string();

        Box::pin(async move {
            let response = builder.send().await.map_err(|e| fetch_error(&e))?;
            let status = response.status();
            if !status.is_success() {
                tracing::debug!(url = %url, status = status.as_u16(), "page request failed");
                return Ok(Value::Null);
            }

            let html = response.text().await.map_err(|e| fetch_error(&e))?;
            Ok(Value::String(html))
        })
    }
}

/// Query string pairs: strings as-is, everything else JSON-encoded
fn query_pairs(data: &Params) -> Vec<(String, String)> {
    data.iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

fn fetch_error(error: &reqwest::Error) -> Value {
    json!({ "code": "fetch_error", "message": error.to_string() })
}

/// Turn a status and body into the API's result.
///
/// Error bodies carrying a `code` are passed through; anything else becomes
/// `{ code: "http_error", message, data: { status } }`.
fn decode_response(status: u16, body: &str) -> Result<Value, Value> {
    let decoded = if body.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
    };

    if (200..300).contains(&status) {
        return Ok(decoded);
    }

    if decoded.get("code").is_some() {
        return Err(decoded);
    }

    let message = decoded
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| format!("Request failed with status {status}."), str::to_string);

    Err(json!({
        "code": "http_error",
        "message": message,
        "data": { "status": status },
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn api() -> HttpApi {
        let config = ApiConfig::new("https://example.com/wp-json/").unwrap()
            .with_nonce("abc");
        HttpApi::new(config).unwrap()
    }

    #[test]
    fn url_includes_namespace_and_datapoint() {
        let request = ApiRequest::get("modules", "tagmanager", "live-container-version");
        assert_eq!(
            api().url(&request),
            "https://example.com/wp-json/google-site-kit/v1/modules/tagmanager/data/live-container-version"
        );
    }

    #[test]
    fn query_pairs_encode_non_strings() {
        let mut data = Params::new();
        data.insert("accountID".to_string(), json!("pub-1"));
        data.insert("internalContainerID".to_string(), json!(42));
        data.insert("skipped".to_string(), Value::Null);

        assert_eq!(
            query_pairs(&data),
            [
                ("accountID".to_string(), "pub-1".to_string()),
                ("internalContainerID".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn success_bodies_decode() {
        assert_eq!(decode_response(200, r#"{"connected":true}"#), Ok(json!({ "connected": true })));
        assert_eq!(decode_response(204, ""), Ok(Value::Null));
    }

    #[test]
    fn error_bodies_pass_through() {
        let body = r#"{"code":"missing_required_scopes","message":"Scopes missing.","data":{"status":403}}"#;
        assert_eq!(
            decode_response(403, body),
            Err(json!({
                "code": "missing_required_scopes",
                "message": "Scopes missing.",
                "data": { "status": 403 },
            }))
        );
    }

    #[test]
    fn opaque_errors_are_synthesized() {
        assert_eq!(
            decode_response(502, "<html>Bad Gateway</html>"),
            Err(json!({
                "code": "http_error",
                "message": "Request failed with status 502.",
                "data": { "status": 502 },
            }))
        );
    }
}
