//! Store fragments
//!
//! A fragment is a partial store: some initial state, action creators,
//! controls, a reducer, resolvers and selectors. Fragments produced by
//! [`create_fetch_store`](crate::fetch_store::create_fetch_store) and
//! hand-written ones are merged with
//! [`combine_stores`](crate::composition::combine_stores) into the
//! definition a registry consumes.
//!
//! Every collection defaults to empty and the reducer to [`PassThrough`],
//! so merging never has to special-case a missing part.

use crate::action::{Action, State};
use crate::error::StoreError;
use crate::reducer::{PassThrough, Reducer};
use crate::routine::Routine;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Keyed collection inside a fragment
pub type Collection<T> = BTreeMap<String, T>;

type PlainFn = dyn Fn(&[Value]) -> Result<Action, StoreError> + Send + Sync;
type RoutineFn = dyn Fn(&[Value]) -> Box<dyn Routine> + Send + Sync;
type ControlFn = dyn Fn(Action) -> BoxFuture<'static, Result<Value, Value>> + Send + Sync;
type SelectorFn = dyn Fn(&State, &[Value]) -> Value + Send + Sync;

/// An action creator exposed by a store
#[derive(Clone)]
pub enum ActionCreator {
    /// Synchronously builds one action, which the registry hands to the reducer
    Plain(Arc<PlainFn>),
    /// Builds a routine that the registry drives to completion
    Routine(Arc<RoutineFn>),
}

impl ActionCreator {
    /// Wrap a function returning a single action
    pub fn plain<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Action, StoreError> + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(f))
    }

    /// Wrap a function returning a routine
    pub fn routine<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Box<dyn Routine> + Send + Sync + 'static,
    {
        Self::Routine(Arc::new(f))
    }
}

impl fmt::Debug for ActionCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => write!(f, "ActionCreator::Plain(<fn>)"),
            Self::Routine(_) => write!(f, "ActionCreator::Routine(<fn>)"),
        }
    }
}

/// Effect handler for actions of one type
#[derive(Clone)]
pub struct Control(Arc<ControlFn>);

impl Control {
    /// Wrap an async handler
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Action) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        Self(Arc::new(
            move |action| -> BoxFuture<'static, Result<Value, Value>> { Box::pin(f(action)) },
        ))
    }

    /// Run the handler for `action`
    pub fn call(&self, action: Action) -> BoxFuture<'static, Result<Value, Value>> {
        (self.0)(action)
    }
}

impl fmt::Debug for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Control(<fn>)")
    }
}

/// Derives a value from state
#[derive(Clone)]
pub struct Selector(Arc<SelectorFn>);

impl Selector {
    /// Wrap a selector function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&State, &[Value]) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluate the selector
    #[must_use]
    pub fn select(&self, state: &State, args: &[Value]) -> Value {
        (self.0)(state, args)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector(<fn>)")
    }
}

/// Coordinates fetches before the selector of the same name is ready
#[derive(Clone)]
pub struct Resolver(Arc<RoutineFn>);

impl Resolver {
    /// Wrap a function building the resolving routine
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Box<dyn Routine> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Build the routine for the given selector arguments
    #[must_use]
    pub fn routine(&self, args: &[Value]) -> Box<dyn Routine> {
        (self.0)(args)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resolver(<fn>)")
    }
}

/// A partial store definition
#[derive(Clone)]
pub struct StoreFragment {
    /// Default state contributed by this fragment
    pub initial_state: State,
    /// Action creators by name
    pub actions: Collection<ActionCreator>,
    /// Controls by action type
    pub controls: Collection<Control>,
    /// Reducer, total over every action type
    pub reducer: Arc<dyn Reducer>,
    /// Resolvers by selector name
    pub resolvers: Collection<Resolver>,
    /// Selectors by name
    pub selectors: Collection<Selector>,
}

impl Default for StoreFragment {
    fn default() -> Self {
        Self {
            initial_state: State::new(),
            actions: Collection::new(),
            controls: Collection::new(),
            reducer: Arc::new(PassThrough),
            resolvers: Collection::new(),
            selectors: Collection::new(),
        }
    }
}

impl fmt::Debug for StoreFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreFragment")
            .field("initial_state", &self.initial_state)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("controls", &self.controls.keys().collect::<Vec<_>>())
            .field("resolvers", &self.resolvers.keys().collect::<Vec<_>>())
            .field("selectors", &self.selectors.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl StoreFragment {
    /// Create an empty fragment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default state member
    #[must_use]
    pub fn with_initial_state(mut self, key: impl Into<String>, value: Value) -> Self {
        self.initial_state.insert(key.into(), value);
        self
    }

    /// Add a plain action creator
    #[must_use]
    pub fn with_action<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Action, StoreError> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), ActionCreator::plain(f));
        self
    }

    /// Add an action creator that returns a routine
    #[must_use]
    pub fn with_routine_action<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Box<dyn Routine> + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), ActionCreator::routine(f));
        self
    }

    /// Add a control for actions of type `kind`
    #[must_use]
    pub fn with_control<F, Fut>(mut self, kind: impl Into<String>, f: F) -> Self
    where
        F: Fn(Action) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Value>> + Send + 'static,
    {
        self.controls.insert(kind.into(), Control::new(f));
        self
    }

    /// Replace the reducer
    #[must_use]
    pub fn with_reducer<R>(mut self, reducer: R) -> Self
    where
        R: Reducer + 'static,
    {
        self.reducer = Arc::new(reducer);
        self
    }

    /// Add a resolver for the selector `name`
    #[must_use]
    pub fn with_resolver<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Value]) -> Box<dyn Routine> + Send + Sync + 'static,
    {
        self.resolvers.insert(name.into(), Resolver::new(f));
        self
    }

    /// Add a selector
    #[must_use]
    pub fn with_selector<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&State, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.selectors.insert(name.into(), Selector::new(f));
        self
    }

    /// Apply the reducer, starting from the initial state when `state` is `None`
    #[must_use]
    pub fn reduce(&self, state: Option<State>, action: &Action) -> State {
        let state = state.unwrap_or_else(|| self.initial_state.clone());
        self.reducer.reduce(state, action)
    }
}
