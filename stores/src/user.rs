//! `core/user`: authentication info and disconnect

use serde_json::Value;
use sitekit_data_core::action::state_value;
use sitekit_data_core::routine::select_then;
use sitekit_data_core::{
    Api, ApiRequest, FetchStoreDescriptor, Routine, State, StoreError, StoreFragment, combine_stores,
    create_fetch_store,
};
use std::sync::Arc;

/// Registry name of the store
pub const STORE_NAME: &str = "core/user";

/// Error code the API returns when required scopes are missing
pub const ERROR_MISSING_REQUIRED_SCOPE: &str = "missing_required_scopes";

/// A member of the authentication info, `null` while it is not loaded
fn authentication_field(state: &State, field: &str) -> Value {
    state
        .get("authentication")
        .and_then(|authentication| authentication.get(field))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Build the `core/user` store.
///
/// Selectors over the authentication info return `null` until it has been
/// loaded from `GET core/user/authentication`:
///
/// - `getAuthentication()`: the whole object
/// - `isAuthenticated()`, `getGrantedScopes()`, `getRequiredScopes()`,
///   `getUnsatisfiedScopes()`, `needsReauthentication()`: single members
/// - `hasScope(scope)`: whether `scope` is among the granted scopes
///
/// `disconnect()` posts to `core/user/disconnect`; `isDoingDisconnect()`
/// tells whether it is in flight.
///
/// # Errors
///
/// Only if fragment names collide, which would be a wiring bug.
pub fn store(api: Arc<dyn Api>) -> Result<StoreFragment, StoreError> {
    let authentication_api = Arc::clone(&api);
    let fetch_get_authentication = create_fetch_store(
        FetchStoreDescriptor::new("getAuthentication")
            .issue_request(move |_| {
                authentication_api.call(ApiRequest::get("core", "user", "authentication"))
            })
            .reduce_response(|mut state, authentication, _| {
                state.insert("authentication".to_string(), authentication);
                state
            }),
    )?;

    let fetch_disconnect = create_fetch_store(
        FetchStoreDescriptor::new("disconnect")
            .issue_request(move |_| api.call(ApiRequest::set("core", "user", "disconnect")))
            .reduce_response(|mut state, disconnected, _| {
                state.insert("disconnected".to_string(), disconnected);
                state
            }),
    )?;

    let resolve_authentication = fetch_get_authentication.clone();
    let disconnect = fetch_disconnect.clone();
    let is_doing_disconnect = fetch_disconnect.clone();

    let base = StoreFragment::new()
        .with_initial_state("authentication", Value::Null)
        .with_initial_state("disconnected", Value::Null)
        .with_routine_action("disconnect", move |_| {
            Box::new(disconnect.fetch(vec![])) as Box<dyn Routine>
        })
        .with_selector("getAuthentication", |state, _| state_value(state, "authentication"))
        .with_selector("isAuthenticated", |state, _| authentication_field(state, "authenticated"))
        .with_selector("getGrantedScopes", |state, _| authentication_field(state, "grantedScopes"))
        .with_selector("getRequiredScopes", |state, _| authentication_field(state, "requiredScopes"))
        .with_selector("getUnsatisfiedScopes", |state, _| {
            authentication_field(state, "unsatisfiedScopes")
        })
        .with_selector("needsReauthentication", |state, _| {
            authentication_field(state, "needsReauthentication")
        })
        .with_selector("hasScope", |state, args| {
            let Value::Array(granted) = authentication_field(state, "grantedScopes") else {
                return Value::Null;
            };
            let scope = args.first().unwrap_or(&Value::Null);
            Value::Bool(granted.contains(scope))
        })
        .with_selector("isDoingDisconnect", move |state, _| {
            Value::Bool(is_doing_disconnect.is_fetching(state, &[]))
        })
        .with_resolver("getAuthentication", move |_| {
            let fetch = resolve_authentication.clone();
            select_then("getAuthentication", vec![], move |authentication| {
                authentication
                    .is_null()
                    .then(|| Box::new(fetch.fetch(vec![])) as Box<dyn Routine>)
            })
        });

    combine_stores([fetch_get_authentication.fragment(), fetch_disconnect.fragment(), base])
}
