//! The REST client seam
//!
//! Stores never talk HTTP directly. Their request issuers call an [`Api`],
//! which the application provides: `HttpApi` in production, a mock in tests.
//!
//! Requests address a datapoint as `kind / identifier / datapoint`, e.g.
//! `modules / adsense / alerts`. Front-end pages are fetched by URL through
//! [`Api::fetch_page`].

use crate::action::Params;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Whether a request reads or writes a datapoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    /// Read, parameters travel as the query string
    Get,
    /// Write, parameters travel as the JSON body
    Set,
}

impl fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Set => write!(f, "SET"),
        }
    }
}

/// One request to the REST API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Read or write
    pub method: ApiMethod,
    /// `core` or `modules`
    pub kind: String,
    /// Store identifier, e.g. `site` or `adsense`
    pub identifier: String,
    /// Datapoint, e.g. `connection` or `alerts`
    pub datapoint: String,
    /// Query parameters (GET) or body data (SET)
    pub data: Params,
}

impl ApiRequest {
    /// Read `kind/identifier/datapoint`
    #[must_use]
    pub fn get(kind: impl Into<String>, identifier: impl Into<String>, datapoint: impl Into<String>) -> Self {
        Self::new(ApiMethod::Get, kind, identifier, datapoint)
    }

    /// Write `kind/identifier/datapoint`
    #[must_use]
    pub fn set(kind: impl Into<String>, identifier: impl Into<String>, datapoint: impl Into<String>) -> Self {
        Self::new(ApiMethod::Set, kind, identifier, datapoint)
    }

    fn new(
        method: ApiMethod,
        kind: impl Into<String>,
        identifier: impl Into<String>,
        datapoint: impl Into<String>,
    ) -> Self {
        Self {
            method,
            kind: kind.into(),
            identifier: identifier.into(),
            datapoint: datapoint.into(),
            data: Params::new(),
        }
    }

    /// Attach query parameters or body data
    #[must_use]
    pub fn with_data(mut self, data: Params) -> Self {
        self.data = data;
        self
    }

    /// `kind/identifier/data/datapoint`, the path below the API namespace
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}/data/{}", self.kind, self.identifier, self.datapoint)
    }
}

/// Executes API requests.
///
/// Errors are JSON objects with at least a `code` and a `message`, exactly
/// as the REST API reports them.
pub trait Api: Send + Sync {
    /// Execute `request`
    fn call(&self, request: ApiRequest) -> BoxFuture<'static, Result<Value, Value>>;

    /// Load a front-end page of the site and return its HTML as a string.
    ///
    /// A page answering with an error status resolves to `null`; only
    /// transport failures reject.
    fn fetch_page(&self, url: &str) -> BoxFuture<'static, Result<Value, Value>>;
}

impl<T: Api + ?Sized> Api for Arc<T> {
    fn call(&self, request: ApiRequest) -> BoxFuture<'static, Result<Value, Value>> {
        (**self).call(request)
    }

    fn fetch_page(&self, url: &str) -> BoxFuture<'static, Result<Value, Value>> {
        (**self).fetch_page(url)
    }
}
