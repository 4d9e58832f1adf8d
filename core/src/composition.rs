//! Store composition utilities
//!
//! This module merges independently written store fragments:
//! - **`collect`**: Union of keyed collections, failing on duplicate keys
//! - **`collect_reducers`**: Fold several reducers over the same state
//! - **`collect_name`**: Assert that several parts agree on one store name
//! - **`combine_stores`**: All of the above applied to whole fragments
//!
//! # Examples
//!
//! ```
//! use sitekit_data_core::action::{Action, State};
//! use sitekit_data_core::composition::combine_stores;
//! use sitekit_data_core::fragment::StoreFragment;
//! use serde_json::{json, Value};
//!
//! let one = StoreFragment::new()
//!     .with_initial_state("one", json!(1))
//!     .with_action("actionOne", |_args: &[Value]| Ok(Action::bare("ACTION_ONE")))
//!     .with_reducer(|mut state: State, action: &Action| {
//!         if action.kind == "ACTION_ONE" {
//!             state.insert("one".to_string(), json!(true));
//!         }
//!         state
//!     });
//! let two = StoreFragment::new()
//!     .with_initial_state("two", json!(2))
//!     .with_selector("getTwo", |state: &State, _args: &[Value]| {
//!         state.get("two").cloned().unwrap_or(Value::Null)
//!     });
//!
//! let combined = combine_stores([one, two]).unwrap();
//! let state = combined.reduce(None, &Action::bare("ACTION_ONE"));
//! assert_eq!(Value::Object(state), json!({ "one": true, "two": 2 }));
//! ```

use crate::action::{Action, State};
use crate::error::StoreError;
use crate::fragment::{Collection, StoreFragment};
use crate::reducer::Reducer;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Merge keyed collections into one.
///
/// # Errors
///
/// Returns [`StoreError::DuplicateKeys`] naming every key that appears in
/// more than one collection. Two modules picking the same name must be
/// caught while wiring stores together, not at dispatch time.
pub fn collect<T, I>(collections: I) -> Result<Collection<T>, StoreError>
where
    I: IntoIterator<Item = Collection<T>>,
{
    let mut merged = Collection::new();
    let mut duplicates: Vec<String> = Vec::new();
    let mut seen_duplicates = BTreeSet::new();

    for collection in collections {
        for (key, value) in collection {
            if merged.contains_key(&key) {
                if seen_duplicates.insert(key.clone()) {
                    duplicates.push(key);
                }
                continue;
            }
            merged.insert(key, value);
        }
    }

    if duplicates.is_empty() {
        Ok(merged)
    } else {
        Err(StoreError::DuplicateKeys {
            caller: "collect",
            keys: duplicates,
        })
    }
}

/// Combine reducers that all operate on the same state.
///
/// The result folds every reducer over the state in the order given, each
/// receiving its predecessor's output.
///
/// ```
/// use sitekit_data_core::action::{Action, State};
/// use sitekit_data_core::composition::collect_reducers;
/// use sitekit_data_core::reducer::Reducer;
/// use serde_json::{json, Value};
/// use std::sync::Arc;
///
/// let mut initial = State::new();
/// initial.insert("count".to_string(), json!(0));
///
/// let reducer = collect_reducers(
///     initial,
///     vec![Arc::new(|mut state: State, action: &Action| {
///         if action.kind == "ACTION_ONE" {
///             state.insert("one".to_string(), json!(true));
///         }
///         state
///     })],
/// );
///
/// let state = reducer.reduce_or_init(None, None);
/// assert_eq!(Value::Object(state.clone()), json!({ "count": 0 }));
///
/// let state = reducer.reduce(state, &Action::bare("ACTION_ONE"));
/// assert_eq!(Value::Object(state), json!({ "count": 0, "one": true }));
/// ```
#[must_use]
pub fn collect_reducers(initial_state: State, reducers: Vec<Arc<dyn Reducer>>) -> CollectedReducer {
    CollectedReducer {
        initial_state,
        reducers,
    }
}

/// A reducer that runs several reducers in sequence.
///
/// Created by [`collect_reducers`].
#[derive(Clone)]
pub struct CollectedReducer {
    initial_state: State,
    reducers: Vec<Arc<dyn Reducer>>,
}

impl CollectedReducer {
    /// The state produced when no state has been set yet
    #[must_use]
    pub const fn initial_state(&self) -> &State {
        &self.initial_state
    }

    /// Reduce with optional state and action.
    ///
    /// A missing state falls back to the initial state; a missing action
    /// leaves the state as it is.
    #[must_use]
    pub fn reduce_or_init(&self, state: Option<State>, action: Option<&Action>) -> State {
        let state = state.unwrap_or_else(|| self.initial_state.clone());
        match action {
            Some(action) => self.reduce(state, action),
            None => state,
        }
    }
}

impl Reducer for CollectedReducer {
    fn reduce(&self, state: State, action: &Action) -> State {
        self.reducers
            .iter()
            .fold(state, |state, reducer| reducer.reduce(state, action))
    }
}

/// Return the single store name shared by all parts.
///
/// # Errors
///
/// Returns [`StoreError::DifferentNames`] unless exactly one distinct name
/// was given.
pub fn collect_name<S: AsRef<str>>(names: &[S]) -> Result<String, StoreError> {
    let unique: BTreeSet<&str> = names.iter().map(AsRef::as_ref).collect();
    let mut iter = unique.into_iter();

    match (iter.next(), iter.next()) {
        (Some(name), None) => Ok(name.to_string()),
        _ => Err(StoreError::DifferentNames),
    }
}

/// Combine store fragments into one.
///
/// - Initial states are shallow-merged in the order given. Where two
///   fragments set the same key the later one wins; keys are expected to be
///   disjoint by convention and are not checked.
/// - Actions, controls, resolvers and selectors are merged with [`collect`]
///   and must not collide.
/// - Reducers run in the order given (see [`collect_reducers`]).
///
/// Combining zero fragments yields an empty fragment whose reducer passes
/// state through unchanged.
///
/// # Errors
///
/// Returns [`StoreError::DuplicateKeys`] if any action, control, resolver or
/// selector name is defined by more than one fragment.
pub fn combine_stores<I>(fragments: I) -> Result<StoreFragment, StoreError>
where
    I: IntoIterator<Item = StoreFragment>,
{
    let mut initial_state = State::new();
    let mut actions = Vec::new();
    let mut controls = Vec::new();
    let mut reducers = Vec::new();
    let mut resolvers = Vec::new();
    let mut selectors = Vec::new();

    for fragment in fragments {
        initial_state.extend(fragment.initial_state);
        actions.push(fragment.actions);
        controls.push(fragment.controls);
        reducers.push(fragment.reducer);
        resolvers.push(fragment.resolvers);
        selectors.push(fragment.selectors);
    }

    tracing::trace!(fragments = reducers.len(), "combining store fragments");

    Ok(StoreFragment {
        actions: collect(actions)?,
        controls: collect(controls)?,
        resolvers: collect(resolvers)?,
        selectors: collect(selectors)?,
        reducer: Arc::new(collect_reducers(initial_state.clone(), reducers)),
        initial_state,
    })
}
