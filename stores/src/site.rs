//! `core/site`: connection, reset, page HTML and site info

mod html;
mod info;

pub use html::RESET_HTML_FOR_URL;
pub use info::RECEIVE_SITE_INFO;

use crate::config::SiteBootstrap;
use serde_json::Value;
use sitekit_data_core::action::state_value;
use sitekit_data_core::routine::select_then;
use sitekit_data_core::{
    Api, ApiRequest, FetchStoreDescriptor, Routine, State, StoreError, StoreFragment, combine_stores,
    create_fetch_store,
};
use std::sync::{Arc, OnceLock};

/// Registry name of the store
pub const STORE_NAME: &str = "core/site";

/// Build the `core/site` store.
///
/// - `getConnection()` reads the connection info, resolved from
///   `GET core/site/connection` on first read
/// - `reset()` removes the site's connection and restores the store's
///   initial state; `isDoingReset()` tells whether it is in flight
/// - `getHTMLForURL(url)` loads a front-end page through
///   [`Api::fetch_page`]; `resetHTMLForURL(url)` forgets it and
///   `waitForHTMLForURL(url)` loads it unless already present
/// - `getSiteInfo()`, `getAdminURL(page, args)` and the other site info
///   selectors read the info received from `bootstrap`
///
/// # Errors
///
/// Only if fragment names collide, which would be a wiring bug.
pub fn store(api: Arc<dyn Api>, bootstrap: &SiteBootstrap) -> Result<StoreFragment, StoreError> {
    let connection_api = Arc::clone(&api);
    let fetch_get_connection = create_fetch_store(
        FetchStoreDescriptor::new("getConnection")
            .issue_request(move |_| connection_api.call(ApiRequest::get("core", "site", "connection")))
            .reduce_response(|mut state, connection, _| {
                state.insert("connection".to_string(), connection);
                state
            }),
    )?;

    let html = html::fragment(Arc::clone(&api))?;

    let initial_state: Arc<OnceLock<State>> = Arc::new(OnceLock::new());
    let reset_initial_state = Arc::clone(&initial_state);
    let fetch_reset = create_fetch_store(
        FetchStoreDescriptor::new("reset")
            .issue_request(move |_| api.call(ApiRequest::set("core", "site", "reset")))
            .reduce_response(move |_state, _response, _| reset_initial_state.get().cloned().unwrap_or_default()),
    )?;

    let resolve_connection = fetch_get_connection.clone();
    let reset = fetch_reset.clone();
    let is_doing_reset = fetch_reset.clone();

    let base = StoreFragment::new()
        .with_initial_state("connection", Value::Null)
        .with_routine_action("reset", move |_| Box::new(reset.fetch(vec![])) as Box<dyn Routine>)
        .with_selector("getConnection", |state, _| state_value(state, "connection"))
        .with_selector("isDoingReset", move |state, _| Value::Bool(is_doing_reset.is_fetching(state, &[])))
        .with_resolver("getConnection", move |_| {
            let fetch = resolve_connection.clone();
            select_then("getConnection", vec![], move |connection| {
                connection
                    .is_null()
                    .then(|| Box::new(fetch.fetch(vec![])) as Box<dyn Routine>)
            })
        });

    let store = combine_stores([
        fetch_get_connection.fragment(),
        fetch_reset.fragment(),
        html,
        info::fragment(bootstrap),
        base,
    ])?;
    let _ = initial_state.set(store.initial_state.clone());

    Ok(store)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitekit_data_core::Action;
    use sitekit_data_testing::{MockApi, trace_routine};

    fn site_store() -> StoreFragment {
        store(Arc::new(MockApi::new()), &SiteBootstrap::default()).unwrap()
    }

    #[test]
    fn initial_state_has_every_slice() {
        assert_eq!(
            Value::Object(site_store().initial_state),
            json!({
                "connection": null,
                "htmlForURL": {},
                "isFetchingGetConnection": {},
                "isFetchingGetHTMLForURL": {},
                "isFetchingReset": {},
                "siteInfo": null,
            })
        );
    }

    #[test]
    fn reset_restores_initial_state() {
        let store = site_store();
        let mut state = store.initial_state.clone();
        state.insert("connection".to_string(), json!({ "connected": true }));

        let state = store.reducer.reduce(state, &Action::new("RECEIVE_RESET", json!({ "response": true, "params": {} })));
        assert_eq!(state, store.initial_state);
    }

    #[test]
    fn resolver_fetches_unknown_connection() {
        let store = site_store();
        let routine = store.resolvers["getConnection"].routine(&[]);

        let trace = trace_routine(routine, |action| {
            (action.kind == "FETCH_GET_CONNECTION").then(|| Ok(json!({ "connected": true })))
        });
        assert_eq!(
            trace.kinds(),
            [
                "START_FETCH_GET_CONNECTION",
                "FETCH_GET_CONNECTION",
                "RECEIVE_GET_CONNECTION",
                "FINISH_FETCH_GET_CONNECTION",
            ]
        );
        assert_eq!(trace.selects, ["getConnection"]);
    }
}
