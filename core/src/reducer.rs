//! The reducer abstraction
//!
//! Reducers are pure functions `(State, &Action) → State`. They take the
//! current state by value and return its replacement; the registry swaps the
//! result in atomically, so readers never see a half-applied transition.
//!
//! # Example
//!
//! ```
//! use sitekit_data_core::action::{Action, State};
//! use sitekit_data_core::reducer::Reducer;
//! use serde_json::json;
//!
//! let reducer = |mut state: State, action: &Action| {
//!     if action.kind == "ACTION_ONE" {
//!         state.insert("one".to_string(), json!(true));
//!     }
//!     state
//! };
//!
//! let state = reducer.reduce(State::new(), &Action::bare("ACTION_ONE"));
//! assert_eq!(state.get("one"), Some(&json!(true)));
//! ```

use crate::action::{Action, State};

/// The Reducer trait - core abstraction for state transitions
///
/// Implementations must be total: an action they do not recognize returns
/// the state unchanged. They must not perform I/O.
pub trait Reducer: Send + Sync {
    /// Apply `action` to `state`, returning the new state
    fn reduce(&self, state: State, action: &Action) -> State;
}

impl<F> Reducer for F
where
    F: Fn(State, &Action) -> State + Send + Sync,
{
    fn reduce(&self, state: State, action: &Action) -> State {
        self(state, action)
    }
}

/// Reducer that returns the state untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Reducer for PassThrough {
    fn reduce(&self, state: State, _action: &Action) -> State {
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pass_through_keeps_state() {
        let mut state = State::new();
        state.insert("hello".to_string(), json!("world"));
        state.insert("cool".to_string(), json!(["beans"]));

        let next = PassThrough.reduce(state.clone(), &Action::bare("ANYTHING"));
        assert_eq!(next, state);
    }
}
