//! # Site Kit Data Testing
//!
//! Testing utilities and helpers for the Site Kit data layer.
//!
//! This crate provides:
//! - [`MockApi`](mocks::MockApi), a scripted stand-in for the REST API
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - [`trace_routine`], which drives a routine synchronously and records
//!   what it yields
//!
//! ## Example
//!
//! ```
//! use sitekit_data_core::{Api, ApiRequest};
//! use sitekit_data_testing::mocks::MockApi;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let api = MockApi::new();
//! api.respond_ok("core/site/data/connection", json!({ "connected": true }));
//!
//! let response = api.call(ApiRequest::get("core", "site", "connection")).await;
//! assert_eq!(response, Ok(json!({ "connected": true })));
//! assert_eq!(api.request_count("core/site/data/connection"), 1);
//! # });
//! ```



pub use reducer_test::ReducerTest;
pub use routine_test::{RoutineTrace, trace_routine};

/// Mock implementations of collaborator traits
pub mod mocks {
    use futures::future::BoxFuture;
    use serde_json::{Value, json};
    use sitekit_data_core::{Api, ApiRequest};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tokio::sync::oneshot;

    enum Scripted {
        Ready(Result<Value, Value>),
        Pending(oneshot::Receiver<Result<Value, Value>>),
    }

    #[derive(Default)]
    struct MockApiState {
        requests: Vec<ApiRequest>,
        pages: Vec<String>,
        responses: HashMap<String, VecDeque<Scripted>>,
    }

    /// Scripted REST API.
    ///
    /// Responses are queued per path (`kind/identifier/data/datapoint`), or
    /// per URL for page fetches, and each is used once, in order. A request
    /// with nothing queued fails with code `no_mock_response`. Every request
    /// is recorded.
    ///
    /// Clones share the same script and request log.
    #[derive(Clone, Default)]
    pub struct MockApi {
        state: Arc<Mutex<MockApiState>>,
    }

    impl std::fmt::Debug for MockApi {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockApi")
                .field("requests", &self.lock().requests.len())
                .finish_non_exhaustive()
        }
    }

    impl MockApi {
        /// Create a mock with nothing scripted
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        fn lock(&self) -> MutexGuard<'_, MockApiState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        fn push(&self, path: &str, scripted: Scripted) {
            self.lock()
                .responses
                .entry(path.to_string())
                .or_default()
                .push_back(scripted);
        }

        /// Queue a successful response for `path` (or page URL)
        pub fn respond_ok(&self, path: &str, response: Value) {
            self.push(path, Scripted::Ready(Ok(response)));
        }

        /// Queue an error response for `path` (or page URL)
        pub fn respond_err(&self, path: &str, error: Value) {
            self.push(path, Scripted::Ready(Err(error)));
        }

        /// Queue a response for `path` that stays pending until the returned
        /// sender is used. Dropping the sender fails the request with code
        /// `cancelled`.
        pub fn respond_pending(&self, path: &str) -> oneshot::Sender<Result<Value, Value>> {
            let (tx, rx) = oneshot::channel();
            self.push(path, Scripted::Pending(rx));
            tx
        }

        /// Every request received so far, in order
        #[must_use]
        pub fn requests(&self) -> Vec<ApiRequest> {
            self.lock().requests.clone()
        }

        /// Number of requests received for `path`
        #[must_use]
        pub fn request_count(&self, path: &str) -> usize {
            self.lock().requests.iter().filter(|r| r.path() == path).count()
        }

        /// Every page URL fetched so far, in order
        #[must_use]
        pub fn page_requests(&self) -> Vec<String> {
            self.lock().pages.clone()
        }

        fn answer(scripted: Option<Scripted>, key: String) -> BoxFuture<'static, Result<Value, Value>> {
            Box::pin(async move {
                match scripted {
                    Some(Scripted::Ready(result)) => result,
                    Some(Scripted::Pending(rx)) => rx.await.unwrap_or_else(|_| {
                        Err(json!({ "code": "cancelled", "message": "Mock response was dropped." }))
                    }),
                    None => Err(json!({
                        "code": "no_mock_response",
                        "message": format!("No mock response for {key}."),
                    })),
                }
            })
        }
    }

    impl Api for MockApi {
        fn call(&self, request: ApiRequest) -> BoxFuture<'static, Result<Value, Value>> {
            let path = request.path();
            let scripted = {
                let mut state = self.lock();
                state.requests.push(request);
                state.responses.get_mut(&path).and_then(VecDeque::pop_front)
            };

            Self::answer(scripted, path)
        }

        fn fetch_page(&self, url: &str) -> BoxFuture<'static, Result<Value, Value>> {
            let scripted = {
                let mut state = self.lock();
                state.pages.push(url.to_string());
                state.responses.get_mut(url).and_then(VecDeque::pop_front)
            };

            Self::answer(scripted, url.to_string())
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber (honours `RUST_LOG`).
    ///
    /// Safe to call from every test; only the first call installs anything.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .try_init();
    }
}

pub use mocks::MockApi;
