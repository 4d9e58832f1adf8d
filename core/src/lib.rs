//! # Site Kit Data Core
//!
//! Building blocks for the Site Kit data layer: named stores whose state is
//! changed by reducers, read by selectors, populated by resolvers and kept in
//! sync with a REST API by controls.
//!
//! This crate is pure. It defines stores; `sitekit-data-runtime` runs them.
//!
//! ## Core Concepts
//!
//! - **State**: a JSON object per store
//! - **Action**: `{ type, payload }` transition record
//! - **Reducer**: pure `(State, &Action) → State`
//! - **Routine**: resumable action sequence, driven by the registry
//! - **Control**: async handler for one action type, the only place I/O happens
//! - **Fragment**: partial store, merged with [`combine_stores`]
//!
//! ## Fetch stores
//!
//! Every API-backed operation shares the same lifecycle: start, request,
//! receive or catch, finish. [`create_fetch_store`] generates all of it from
//! a base name and three functions.
//!
//! ```
//! use sitekit_data_core::{FetchStoreDescriptor, StoreFragment, combine_stores, create_fetch_store};
//! use serde_json::{json, Value};
//!
//! let connection = create_fetch_store(
//!     FetchStoreDescriptor::new("getConnection")
//!         .issue_request(|_| async { Ok(json!({ "connected": true })) })
//!         .reduce_response(|mut state, connection, _| {
//!             state.insert("connection".to_string(), connection);
//!             state
//!         }),
//! )
//! .unwrap();
//!
//! let store = combine_stores([
//!     connection.fragment(),
//!     StoreFragment::new().with_initial_state("connection", Value::Null),
//! ])
//! .unwrap();
//!
//! assert!(store.actions.contains_key("fetchGetConnection"));
//! assert!(store.selectors.contains_key("isFetchingGetConnection"));
//! ```

pub mod action;
pub mod api;
pub mod case;
pub mod composition;
pub mod error;
pub mod fetch_store;
pub mod fragment;
pub mod reducer;
pub mod routine;
pub mod stringify;

pub use action::{Action, Params, State};
pub use api::{Api, ApiMethod, ApiRequest};
pub use composition::{CollectedReducer, collect, collect_name, collect_reducers, combine_stores};
pub use error::{ArgsError, StoreError};
pub use fetch_store::{FetchNames, FetchOutcome, FetchRoutine, FetchStore, FetchStoreDescriptor, create_fetch_store};
pub use fragment::{ActionCreator, Collection, Control, Resolver, Selector, StoreFragment};
pub use reducer::Reducer;
pub use routine::{Resume, Routine, Step};
