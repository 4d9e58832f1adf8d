//! Fetch store factory
//!
//! [`create_fetch_store`] builds the infrastructure for a single API-backed
//! operation from a [`FetchStoreDescriptor`]:
//!
//! - a fetch action creator (a [`FetchRoutine`]) and a receive action creator
//! - a control issuing the request
//! - a reducer tracking in-flight requests and receiving the response
//! - a selector telling whether a request is in flight
//!
//! Names derive from the base name. For `saveSettings`:
//!
//! - the fetch action creator is `fetchSaveSettings`,
//! - the receive action creator is `receiveSaveSettings`,
//! - the in-flight selector is `isFetchingSaveSettings`,
//! - the action types are `START_FETCH_SAVE_SETTINGS`, `FETCH_SAVE_SETTINGS`,
//!   `RECEIVE_SAVE_SETTINGS`, `FINISH_FETCH_SAVE_SETTINGS` and
//!   `CATCH_FETCH_SAVE_SETTINGS`.
//!
//! All of these are internal building blocks. A store exposes its own public
//! action or resolver which delegates to the fetch routine: an action
//! `storeMySetting` calls `fetchStoreMySetting`, a resolver for `getSomeData`
//! calls `fetchGetSomeData`.
//!
//! # Example
//!
//! ```
//! use sitekit_data_core::error::require;
//! use sitekit_data_core::fetch_store::{FetchStoreDescriptor, create_fetch_store};
//! use sitekit_data_core::action::Params;
//! use serde_json::{json, Value};
//!
//! let store = create_fetch_store(
//!     FetchStoreDescriptor::new("getAlerts")
//!         .issue_request(|params: Params| async move { Ok(json!([params])) })
//!         .reduce_response(|mut state, alerts, params| {
//!             let mut by_account = serde_json::Map::new();
//!             let account = params.get("accountID").and_then(Value::as_str).unwrap_or_default();
//!             by_account.insert(account.to_string(), alerts);
//!             state.insert("alerts".to_string(), Value::Object(by_account));
//!             state
//!         })
//!         .normalize_args(|args: &[Value]| {
//!             let account_id = args.first().cloned().unwrap_or(Value::Null);
//!             require(!account_id.is_null(), "accountID is required.")?;
//!             let mut params = Params::new();
//!             params.insert("accountID".to_string(), account_id);
//!             Ok(params)
//!         }),
//! )
//! .unwrap();
//!
//! assert_eq!(store.names().fetch_creator, "fetchGetAlerts");
//! assert!(store.requires_params());
//! ```

use crate::action::{Action, Params, State};
use crate::case::{camel_case_to_constant_case, camel_case_to_pascal_case};
use crate::error::{ArgsError, StoreError};
use crate::fragment::{ActionCreator, Control, Selector, StoreFragment};
use crate::reducer::Reducer;
use crate::routine::{Resume, Routine, Step};
use crate::stringify::stringify_params;
use futures::future::BoxFuture;
use serde_json::{Map, Value, json};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type IssueRequestFn = dyn Fn(Params) -> BoxFuture<'static, Result<Value, Value>> + Send + Sync;
type ReduceResponseFn = dyn Fn(State, Value, &Params) -> State + Send + Sync;
type NormalizeArgsFn = dyn Fn(&[Value]) -> Result<Params, ArgsError> + Send + Sync;

/// Configuration of one asynchronous operation
pub struct FetchStoreDescriptor {
    base_name: String,
    issue_request: Option<Arc<IssueRequestFn>>,
    reduce_response: Arc<ReduceResponseFn>,
    normalize_args: Arc<NormalizeArgsFn>,
}

impl FetchStoreDescriptor {
    /// Start a descriptor for the given camelCase base name
    #[must_use]
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            issue_request: None,
            reduce_response: Arc::new(|state: State, _response: Value, _params: &Params| state),
            normalize_args: Arc::new(|_args: &[Value]| Ok(Params::new())),
        }
    }

    /// Set the function issuing the request.
    ///
    /// It receives the normalized params and must touch only the resource
    /// those params identify. Required.
    #[must_use]
    pub fn issue_request<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        self.issue_request = Some(Arc::new(
            move |params| -> BoxFuture<'static, Result<Value, Value>> { Box::pin(f(params)) },
        ));
        self
    }

    /// Set the function folding a response into state.
    ///
    /// Receives the state, the response and the params of the request. When
    /// not set the state is left unmodified.
    #[must_use]
    pub fn reduce_response<F>(mut self, f: F) -> Self
    where
        F: Fn(State, Value, &Params) -> State + Send + Sync + 'static,
    {
        self.reduce_response = Arc::new(f);
        self
    }

    /// Set the function validating caller arguments and turning them into a
    /// params object keyed by argument name.
    ///
    /// When not set, no arguments are supported and params are always `{}`.
    #[must_use]
    pub fn normalize_args<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Params, ArgsError> + Send + Sync + 'static,
    {
        self.normalize_args = Arc::new(f);
        self
    }
}

impl fmt::Debug for FetchStoreDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStoreDescriptor")
            .field("base_name", &self.base_name)
            .field("issue_request", &self.issue_request.is_some())
            .finish_non_exhaustive()
    }
}

/// Identifiers derived from a base name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchNames {
    /// `FETCH_<BASE>`, handled by the control
    pub fetch: String,
    /// `START_FETCH_<BASE>`
    pub start_fetch: String,
    /// `FINISH_FETCH_<BASE>`
    pub finish_fetch: String,
    /// `CATCH_FETCH_<BASE>`
    pub catch_fetch: String,
    /// `RECEIVE_<BASE>`
    pub receive: String,
    /// `fetch<Base>` action creator
    pub fetch_creator: String,
    /// `receive<Base>` action creator
    pub receive_creator: String,
    /// `isFetching<Base>` selector, also the state key of the in-flight map
    pub is_fetching: String,
}

impl FetchNames {
    /// Derive every identifier from `base_name`
    #[must_use]
    pub fn new(base_name: &str) -> Self {
        let pascal = camel_case_to_pascal_case(base_name);
        let constant = camel_case_to_constant_case(base_name);
        let fetch = format!("FETCH_{constant}");

        Self {
            start_fetch: format!("START_{fetch}"),
            finish_fetch: format!("FINISH_{fetch}"),
            catch_fetch: format!("CATCH_{fetch}"),
            receive: format!("RECEIVE_{constant}"),
            fetch,
            fetch_creator: format!("fetch{pascal}"),
            receive_creator: format!("receive{pascal}"),
            is_fetching: format!("isFetching{pascal}"),
        }
    }
}

/// Validate a descriptor and build its fetch store.
///
/// The normalizer is called once with zero arguments. If that fails, the
/// receive action creator insists on an explicit params object.
///
/// # Errors
///
/// - [`StoreError::MissingBaseName`] if the base name is empty
/// - [`StoreError::MissingIssueRequest`] if no request issuer was set
pub fn create_fetch_store(descriptor: FetchStoreDescriptor) -> Result<FetchStore, StoreError> {
    let FetchStoreDescriptor {
        base_name,
        issue_request,
        reduce_response,
        normalize_args,
    } = descriptor;

    if base_name.is_empty() {
        return Err(StoreError::MissingBaseName);
    }
    let issue_request = issue_request.ok_or(StoreError::MissingIssueRequest)?;

    let requires_params = normalize_args(&[]).is_err();
    let names = FetchNames::new(&base_name);

    tracing::trace!(
        base_name = %base_name,
        requires_params,
        "created fetch store"
    );

    Ok(FetchStore {
        inner: Arc::new(FetchStoreInner {
            names,
            requires_params,
            issue_request,
            reduce_response,
            normalize_args,
        }),
    })
}

/// The generated infrastructure for one operation.
///
/// Cheap to clone. Use [`FetchStore::fragment`] to combine it into a store,
/// and the typed methods to delegate to it from hand-written actions,
/// resolvers and selectors.
#[derive(Clone)]
pub struct FetchStore {
    inner: Arc<FetchStoreInner>,
}

struct FetchStoreInner {
    names: FetchNames,
    requires_params: bool,
    issue_request: Arc<IssueRequestFn>,
    reduce_response: Arc<ReduceResponseFn>,
    normalize_args: Arc<NormalizeArgsFn>,
}

impl fmt::Debug for FetchStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchStore")
            .field("names", &self.inner.names)
            .field("requires_params", &self.inner.requires_params)
            .finish_non_exhaustive()
    }
}

impl FetchStore {
    /// Derived identifiers
    #[must_use]
    pub fn names(&self) -> &FetchNames {
        &self.inner.names
    }

    /// Whether calling the normalizer without arguments fails
    #[must_use]
    pub fn requires_params(&self) -> bool {
        self.inner.requires_params
    }

    /// Validate and normalize caller arguments
    ///
    /// # Errors
    ///
    /// Whatever the descriptor's normalizer rejects.
    pub fn normalize(&self, args: &[Value]) -> Result<Params, ArgsError> {
        (self.inner.normalize_args)(args)
    }

    /// The fetch action creator: a routine issuing the request for `args`
    #[must_use]
    pub fn fetch(&self, args: Vec<Value>) -> FetchRoutine {
        FetchRoutine {
            store: self.clone(),
            phase: FetchPhase::Idle { args },
        }
    }

    /// The receive action creator.
    ///
    /// `None` stands for an argument that was not passed at all.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ResponseRequired`] when `response` is `None`
    /// - [`StoreError::ParamsRequired`] when the store requires params and
    ///   `params` is not an object
    pub fn receive(&self, response: Option<Value>, params: Option<Value>) -> Result<Action, StoreError> {
        let response = response.ok_or(StoreError::ResponseRequired)?;

        let params = if self.inner.requires_params {
            match params {
                Some(Value::Object(params)) => params,
                _ => return Err(StoreError::ParamsRequired),
            }
        } else {
            Params::new()
        };

        Ok(self.receive_action(response, params))
    }

    fn receive_action(&self, response: Value, params: Params) -> Action {
        Action::new(
            self.inner.names.receive.clone(),
            json!({ "response": response, "params": params }),
        )
    }

    fn params_action(&self, kind: &str, params: &Params) -> Action {
        Action::new(kind, json!({ "params": params }))
    }

    /// The in-flight selector.
    ///
    /// Fails open: unset state, arguments the normalizer rejects and
    /// never-started parameter sets all read as `false`.
    #[must_use]
    pub fn is_fetching(&self, state: &State, args: &[Value]) -> bool {
        let Some(in_flight) = state.get(&self.inner.names.is_fetching).and_then(Value::as_object) else {
            return false;
        };

        let Ok(params) = self.normalize(args) else {
            return false;
        };

        in_flight
            .get(&stringify_params(&params))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Issue the request for `params` (what the control runs)
    pub fn issue(&self, params: Params) -> BoxFuture<'static, Result<Value, Value>> {
        (self.inner.issue_request)(params)
    }

    /// Initial state: an empty in-flight map
    #[must_use]
    pub fn initial_state(&self) -> State {
        let mut state = State::new();
        state.insert(self.inner.names.is_fetching.clone(), Value::Object(Map::new()));
        state
    }

    fn set_in_flight(&self, mut state: State, params: &Params, in_flight: bool) -> State {
        let key = self.inner.names.is_fetching.clone();
        let mut map = state
            .remove(&key)
            .and_then(|value| match value {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_default();

        map.insert(stringify_params(params), Value::Bool(in_flight));
        state.insert(key, Value::Object(map));
        state
    }

    /// The partial store to combine into a full store definition
    #[must_use]
    pub fn fragment(&self) -> StoreFragment {
        let names = &self.inner.names;

        let fetch_store = self.clone();
        let receive_store = self.clone();
        let control_store = self.clone();
        let selector_store = self.clone();

        let mut fragment = StoreFragment::new();
        fragment.initial_state = self.initial_state();
        fragment.actions.insert(
            names.fetch_creator.clone(),
            ActionCreator::routine(move |args| {
                Box::new(fetch_store.fetch(args.to_vec())) as Box<dyn Routine>
            }),
        );
        fragment.actions.insert(
            names.receive_creator.clone(),
            ActionCreator::plain(move |args| {
                receive_store.receive(args.first().cloned(), args.get(1).cloned())
            }),
        );
        fragment.controls.insert(
            names.fetch.clone(),
            Control::new(move |action: Action| control_store.issue(action.params())),
        );
        fragment.reducer = Arc::new(self.clone());
        fragment.selectors.insert(
            names.is_fetching.clone(),
            Selector::new(move |state, args| Value::Bool(selector_store.is_fetching(state, args))),
        );
        fragment
    }
}

impl Reducer for FetchStore {
    fn reduce(&self, state: State, action: &Action) -> State {
        let names = &self.inner.names;
        let kind = action.kind.as_str();

        if kind == names.start_fetch {
            self.set_in_flight(state, &action.params(), true)
        } else if kind == names.receive {
            let Some(response) = action.payload_field("response").cloned() else {
                tracing::warn!(action = %kind, "receive action without a response ignored");
                return state;
            };
            (self.inner.reduce_response)(state, response, &action.params())
        } else if kind == names.finish_fetch {
            self.set_in_flight(state, &action.params(), false)
        } else if kind == names.catch_fetch {
            let error = action.payload_field("error").cloned().unwrap_or(Value::Null);
            let mut state = self.set_in_flight(state, &action.params(), false);
            state.insert("error".to_string(), error);
            state
        } else {
            state
        }
    }
}

/// Result of a fetch routine.
///
/// Exactly one of `response` and `error` is set. In its JSON form an unset
/// member is omitted rather than `null`, since `null` is a valid response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchOutcome {
    /// The response, when the request succeeded
    pub response: Option<Value>,
    /// The error, when arguments were invalid or the request failed
    pub error: Option<Value>,
}

impl FetchOutcome {
    /// Successful outcome
    #[must_use]
    pub const fn success(response: Value) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    /// Failed outcome
    #[must_use]
    pub const fn failure(error: Value) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }

    /// Whether the request produced a response
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Decode the JSON form produced by [`FetchRoutine`]
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        Self {
            response: value.get("response").cloned(),
            error: value.get("error").cloned(),
        }
    }

    /// Convert into a `Result`
    ///
    /// # Errors
    ///
    /// Returns the error value when the outcome is a failure.
    pub fn into_result(self) -> Result<Value, Value> {
        match (self.response, self.error) {
            (_, Some(error)) => Err(error),
            (Some(response), None) => Ok(response),
            (None, None) => Ok(Value::Null),
        }
    }
}

impl From<FetchOutcome> for Value {
    fn from(outcome: FetchOutcome) -> Self {
        let mut map = Map::new();
        if let Some(response) = outcome.response {
            map.insert("response".to_string(), response);
        }
        if let Some(error) = outcome.error {
            map.insert("error".to_string(), error);
        }
        Self::Object(map)
    }
}

/// The fetch action creator's routine.
///
/// ```text
/// Idle ──start──▶ Started ──▶ AwaitingResponse ──ok──▶ Received ──▶ Finishing ──▶ Done
///   │                               │
///   └─invalid args──▶ Done          └─error──▶ Failed ──▶ Done
/// ```
///
/// Yields `START_FETCH_*`, `FETCH_*` (for the control), then either
/// `RECEIVE_*` and `FINISH_FETCH_*`, or `CATCH_FETCH_*`. Completes with a
/// [`FetchOutcome`] in JSON form. Request errors and invalid arguments end up
/// in the outcome; they never fail the routine.
pub struct FetchRoutine {
    store: FetchStore,
    phase: FetchPhase,
}

enum FetchPhase {
    Idle { args: Vec<Value> },
    Started { params: Params },
    AwaitingResponse { params: Params },
    Received { params: Params, response: Value },
    Finishing { response: Value },
    Failed { error: Value },
    Done(FetchOutcome),
}

impl FetchRoutine {
    fn complete(&mut self, outcome: FetchOutcome) -> Step {
        self.phase = FetchPhase::Done(outcome.clone());
        Step::Complete(outcome.into())
    }
}

impl fmt::Debug for FetchRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            FetchPhase::Idle { .. } => "idle",
            FetchPhase::Started { .. } => "started",
            FetchPhase::AwaitingResponse { .. } => "awaiting-response",
            FetchPhase::Received { .. } => "received",
            FetchPhase::Finishing { .. } => "finishing",
            FetchPhase::Failed { .. } => "failed",
            FetchPhase::Done(_) => "done",
        };
        f.debug_struct("FetchRoutine")
            .field("fetch", &self.store.names().fetch)
            .field("phase", &phase)
            .finish()
    }
}

impl Routine for FetchRoutine {
    fn resume(&mut self, input: Resume) -> Step {
        let phase = std::mem::replace(&mut self.phase, FetchPhase::Done(FetchOutcome::default()));

        match (phase, input) {
            (FetchPhase::Idle { args }, Resume::Start | Resume::Value(_)) => {
                match self.store.normalize(&args) {
                    Ok(params) => {
                        let action = self.store.params_action(&self.store.names().start_fetch, &params);
                        self.phase = FetchPhase::Started { params };
                        Step::Yield(action)
                    },
                    Err(error) => {
                        tracing::error!(
                            action = %self.store.names().fetch_creator,
                            "{}",
                            error.message()
                        );
                        self.complete(FetchOutcome::failure(error.to_value()))
                    },
                }
            },
            (FetchPhase::Started { params }, Resume::Start | Resume::Value(_)) => {
                let action = self.store.params_action(&self.store.names().fetch, &params);
                self.phase = FetchPhase::AwaitingResponse { params };
                Step::Yield(action)
            },
            (FetchPhase::AwaitingResponse { params }, Resume::Value(response)) => {
                let receive_params = if self.store.requires_params() {
                    params.clone()
                } else {
                    Params::new()
                };
                let action = self.store.receive_action(response.clone(), receive_params);
                self.phase = FetchPhase::Received { params, response };
                Step::Yield(action)
            },
            (FetchPhase::AwaitingResponse { params }, Resume::Error(error)) => {
                let action = Action::new(
                    self.store.names().catch_fetch.clone(),
                    json!({ "error": error, "params": params }),
                );
                self.phase = FetchPhase::Failed { error };
                Step::Yield(action)
            },
            (FetchPhase::Received { params, response }, Resume::Start | Resume::Value(_)) => {
                let action = self.store.params_action(&self.store.names().finish_fetch, &params);
                self.phase = FetchPhase::Finishing { response };
                Step::Yield(action)
            },
            (FetchPhase::Finishing { response }, Resume::Start | Resume::Value(_)) => {
                self.complete(FetchOutcome::success(response))
            },
            (FetchPhase::Failed { error }, Resume::Start | Resume::Value(_)) => {
                self.complete(FetchOutcome::failure(error))
            },
            (FetchPhase::Done(outcome), Resume::Start | Resume::Value(_)) => self.complete(outcome),
            (_, Resume::Error(error)) => Step::Fail(error),
            (FetchPhase::AwaitingResponse { params }, Resume::Start) => {
                self.phase = FetchPhase::AwaitingResponse { params };
                Step::Fail(json!({ "code": "missing_response", "message": "response is required." }))
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::require;

    fn get_some_data() -> FetchStore {
        create_fetch_store(
            FetchStoreDescriptor::new("getSomeData")
                .issue_request(|params: Params| async move { Ok(Value::Object(params)) })
                .reduce_response(|mut state, response, params| {
                    let key = params
                        .get("aParam")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let mut data = state
                        .remove("data")
                        .and_then(|d| d.as_object().cloned())
                        .unwrap_or_default();
                    data.insert(key, response);
                    state.insert("data".to_string(), Value::Object(data));
                    state
                })
                .normalize_args(|args: &[Value]| {
                    let obj_param = args.first().cloned().unwrap_or(Value::Null);
                    require(obj_param.is_object(), "objParam is required.")?;
                    let a_param = args.get(1).cloned().unwrap_or(Value::Null);
                    require(!a_param.is_null(), "aParam is required.")?;

                    let mut params = Params::new();
                    params.insert("objParam".to_string(), obj_param);
                    params.insert("aParam".to_string(), a_param);
                    Ok(params)
                }),
        )
        .unwrap()
    }

    fn save_some_data() -> FetchStore {
        create_fetch_store(
            FetchStoreDescriptor::new("SaveSomeData").issue_request(|_| async { Ok(json!(true)) }),
        )
        .unwrap()
    }

    #[test]
    fn names_derive_from_base_name() {
        let names = FetchNames::new("saveSomeData");
        assert_eq!(names.fetch, "FETCH_SAVE_SOME_DATA");
        assert_eq!(names.start_fetch, "START_FETCH_SAVE_SOME_DATA");
        assert_eq!(names.finish_fetch, "FINISH_FETCH_SAVE_SOME_DATA");
        assert_eq!(names.catch_fetch, "CATCH_FETCH_SAVE_SOME_DATA");
        assert_eq!(names.receive, "RECEIVE_SAVE_SOME_DATA");
        assert_eq!(names.fetch_creator, "fetchSaveSomeData");
        assert_eq!(names.receive_creator, "receiveSaveSomeData");
        assert_eq!(names.is_fetching, "isFetchingSaveSomeData");
    }

    #[test]
    fn requires_base_name() {
        let err = create_fetch_store(
            FetchStoreDescriptor::new("").issue_request(|_| async { Ok(Value::Null) }),
        )
        .err();
        assert_eq!(err, Some(StoreError::MissingBaseName));
        assert_eq!(StoreError::MissingBaseName.to_string(), "baseName is required.");
    }

    #[test]
    fn requires_issue_request() {
        let err = create_fetch_store(FetchStoreDescriptor::new("getSomeData")).err();
        assert_eq!(err, Some(StoreError::MissingIssueRequest));
    }

    #[test]
    fn fragment_has_expected_actions_and_selectors() {
        let fragment = save_some_data().fragment();

        assert_eq!(
            fragment.actions.keys().collect::<Vec<_>>(),
            ["fetchSaveSomeData", "receiveSaveSomeData"]
        );
        assert_eq!(
            fragment.selectors.keys().collect::<Vec<_>>(),
            ["isFetchingSaveSomeData"]
        );
        assert_eq!(fragment.controls.keys().collect::<Vec<_>>(), ["FETCH_SAVE_SOME_DATA"]);
        assert!(fragment.resolvers.is_empty());
        assert_eq!(
            Value::Object(fragment.initial_state),
            json!({ "isFetchingSaveSomeData": {} })
        );
    }

    #[test]
    fn required_params_follow_empty_normalization() {
        assert!(get_some_data().requires_params());
        assert!(!save_some_data().requires_params());
    }

    #[test]
    fn receive_requires_response() {
        let store = save_some_data();
        assert_eq!(store.receive(None, None), Err(StoreError::ResponseRequired));
        assert_eq!(StoreError::ResponseRequired.to_string(), "response is required.");
    }

    #[test]
    fn receive_requires_params_when_normalizer_does() {
        let store = get_some_data();
        assert_eq!(store.receive(Some(json!({})), None), Err(StoreError::ParamsRequired));
        assert_eq!(
            store.receive(Some(json!({})), Some(json!("nope"))),
            Err(StoreError::ParamsRequired)
        );
        assert!(store.receive(Some(json!({})), Some(json!({ "aParam": "x" }))).is_ok());
    }

    #[test]
    fn receive_forces_empty_params_when_not_required() {
        let action = save_some_data()
            .receive(Some(json!({})), Some(json!({ "ignored": true })))
            .unwrap();

        assert_eq!(action.kind, "RECEIVE_SAVE_SOME_DATA");
        assert_eq!(action.payload, json!({ "response": {}, "params": {} }));
    }

    #[test]
    fn reducer_tracks_in_flight_per_params() {
        let store = get_some_data();
        let args = [json!({}), json!("aValue")];
        let other = [json!({}), json!("anotherValue")];
        let params = store.normalize(&args).unwrap_or_default();

        let state = store.initial_state();
        assert!(!store.is_fetching(&state, &args));

        let state = store.reduce(state, &store.params_action(&store.names().start_fetch, &params));
        assert!(store.is_fetching(&state, &args));
        assert!(!store.is_fetching(&state, &other));

        let state = store.reduce(
            state,
            &store
                .receive(Some(json!({ "someValue": 42 })), Some(Value::Object(params.clone())))
                .unwrap(),
        );
        assert_eq!(state.get("data"), Some(&json!({ "aValue": { "someValue": 42 } })));

        let state = store.reduce(state, &store.params_action(&store.names().finish_fetch, &params));
        assert!(!store.is_fetching(&state, &args));
    }

    #[test]
    fn catch_records_last_error() {
        let store = save_some_data();
        let params = Params::new();

        let state = store.reduce(store.initial_state(), &store.params_action(&store.names().start_fetch, &params));
        let state = store.reduce(
            state,
            &Action::new(
                store.names().catch_fetch.clone(),
                json!({ "error": { "code": "x" }, "params": {} }),
            ),
        );

        assert_eq!(state.get("error"), Some(&json!({ "code": "x" })));
        assert!(!store.is_fetching(&state, &[]));
    }

    #[test]
    fn unknown_actions_pass_through() {
        let store = save_some_data();
        let state = store.initial_state();
        assert_eq!(store.reduce(state.clone(), &Action::bare("SOMETHING_ELSE")), state);
    }

    #[test]
    fn selector_fails_open() {
        let store = get_some_data();

        // Uninitialized slice
        assert!(!store.is_fetching(&State::new(), &[json!({}), json!("a")]));
        // Arguments the normalizer rejects
        assert!(!store.is_fetching(&store.initial_state(), &[]));
    }

    #[test]
    fn in_flight_key_ignores_param_order() {
        let store = create_fetch_store(
            FetchStoreDescriptor::new("getReport")
                .issue_request(|_| async { Ok(Value::Null) })
                .normalize_args(|args: &[Value]| {
                    args.first()
                        .and_then(Value::as_object)
                        .cloned()
                        .ok_or_else(|| ArgsError::new("options are required."))
                }),
        )
        .unwrap();

        let forward = json!({ "a": 1, "b": 2 });
        let backward = json!({ "b": 2, "a": 1 });
        let params = store.normalize(&[forward]).unwrap_or_default();

        let state = store.reduce(store.initial_state(), &store.params_action(&store.names().start_fetch, &params));
        assert!(store.is_fetching(&state, &[backward]));
    }

    #[tokio::test]
    async fn control_issues_request_with_params() {
        let store = get_some_data();
        let fragment = store.fragment();
        let control = &fragment.controls["FETCH_GET_SOME_DATA"];

        let response = control
            .call(Action::new("FETCH_GET_SOME_DATA", json!({ "params": { "aParam": "x" } })))
            .await;
        assert_eq!(response, Ok(json!({ "aParam": "x" })));
    }
}
