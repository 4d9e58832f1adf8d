//! `modules/tagmanager`: live container versions

use crate::validation::{id_segment, is_valid_numeric_id};
use serde_json::{Map, Value, json};
use sitekit_data_core::error::require;
use sitekit_data_core::routine::{select_then, sequence};
use sitekit_data_core::{
    Api, ApiRequest, FetchStoreDescriptor, Params, Routine, State, StoreError, StoreFragment, combine_stores,
    create_fetch_store,
};
use std::sync::Arc;

/// Registry name of the store
pub const STORE_NAME: &str = "modules/tagmanager";

/// State key of a container version: `"<accountID>::<internalContainerID>"`
#[must_use]
pub fn version_key(account_id: &Value, internal_container_id: &Value) -> String {
    format!("{}::{}", id_segment(account_id), id_segment(internal_container_id))
}

fn live_container_version(state: &State, args: &[Value]) -> Value {
    let account_id = args.first().unwrap_or(&Value::Null);
    let internal_container_id = args.get(1).unwrap_or(&Value::Null);

    state
        .get("liveContainerVersions")
        .and_then(|versions| versions.get(version_key(account_id, internal_container_id)))
        .cloned()
        .unwrap_or(Value::Null)
}

fn valid_ids(args: &[Value]) -> bool {
    let account_id = args.first().unwrap_or(&Value::Null);
    let internal_container_id = args.get(1).unwrap_or(&Value::Null);
    is_valid_numeric_id(account_id) && is_valid_numeric_id(internal_container_id)
}

/// Build the `modules/tagmanager` store.
///
/// - `getLiveContainerVersion(accountID, internalContainerID)` returns the
///   live version of a container, `null` until loaded; resolved for valid
///   numeric IDs only
/// - `isDoingGetLiveContainerVersion(accountID, internalContainerID)` tells
///   whether that version is being fetched
///
/// # Errors
///
/// Only if fragment names collide, which would be a wiring bug.
pub fn store(api: Arc<dyn Api>) -> Result<StoreFragment, StoreError> {
    let fetch_get_live_container_version = create_fetch_store(
        FetchStoreDescriptor::new("getLiveContainerVersion")
            .issue_request(move |params: Params| {
                api.call(ApiRequest::get("modules", "tagmanager", "live-container-version").with_data(params))
            })
            .reduce_response(|mut state, version, params| {
                let key = version_key(
                    params.get("accountID").unwrap_or(&Value::Null),
                    params.get("internalContainerID").unwrap_or(&Value::Null),
                );
                let mut versions = state
                    .remove("liveContainerVersions")
                    .and_then(|versions| match versions {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .unwrap_or_else(Map::new);
                versions.insert(key, version);
                state.insert("liveContainerVersions".to_string(), Value::Object(versions));
                state
            })
            .normalize_args(|args: &[Value]| {
                let account_id = args.first().cloned().unwrap_or(Value::Null);
                let internal_container_id = args.get(1).cloned().unwrap_or(Value::Null);
                require(
                    is_valid_numeric_id(&account_id),
                    "A valid accountID is required to fetch or receive a live container version.",
                )?;
                require(
                    is_valid_numeric_id(&internal_container_id),
                    "A valid internalContainerID is required to fetch or receive a live container version.",
                )?;

                let mut params = Params::new();
                params.insert("accountID".to_string(), account_id);
                params.insert("internalContainerID".to_string(), internal_container_id);
                Ok(params)
            }),
    )?;

    let resolve_version = fetch_get_live_container_version.clone();
    let is_doing = fetch_get_live_container_version.clone();

    let base = StoreFragment::new()
        .with_initial_state("liveContainerVersions", json!({}))
        .with_selector("getLiveContainerVersion", live_container_version)
        .with_selector("isDoingGetLiveContainerVersion", move |state, args| {
            Value::Bool(is_doing.is_fetching(state, args))
        })
        .with_resolver("getLiveContainerVersion", move |args| {
            if !valid_ids(args) {
                return sequence(vec![]);
            }

            let fetch = resolve_version.clone();
            let args = args.to_vec();
            select_then("getLiveContainerVersion", args.clone(), move |existing| {
                existing
                    .is_null()
                    .then(|| Box::new(fetch.fetch(args)) as Box<dyn Routine>)
            })
        });

    combine_stores([fetch_get_live_container_version.fragment(), base])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sitekit_data_core::ActionCreator;
    use sitekit_data_testing::{MockApi, trace_routine};

    fn tagmanager_store() -> StoreFragment {
        store(Arc::new(MockApi::new())).unwrap()
    }

    #[test]
    fn version_keys_join_ids() {
        assert_eq!(version_key(&json!("100"), &json!(200)), "100::200");
    }

    #[test]
    fn received_versions_are_keyed_by_both_ids() {
        let store = tagmanager_store();
        let ActionCreator::Plain(receive) = store.actions["receiveGetLiveContainerVersion"].clone() else {
            unreachable!("receive is a plain action creator");
        };

        let action = receive(&[
            json!({ "containerVersionId": "3" }),
            json!({ "accountID": "100", "internalContainerID": "200" }),
        ]).unwrap();
        let state = store.reducer.reduce(store.initial_state.clone(), &action);

        let select = &store.selectors["getLiveContainerVersion"];
        assert_eq!(
            select.select(&state, &[json!("100"), json!("200")]),
            json!({ "containerVersionId": "3" })
        );
        assert_eq!(select.select(&state, &[json!("100"), json!("201")]), Value::Null);
    }

    #[test]
    fn invalid_ids_are_rejected_with_a_message() {
        let store = tagmanager_store();
        let ActionCreator::Routine(fetch) = store.actions["fetchGetLiveContainerVersion"].clone() else {
            unreachable!("fetch is a routine");
        };

        let trace = trace_routine(fetch(&[json!("abc"), json!("200")]), |_| None);
        assert!(trace.actions.is_empty());
        assert_eq!(
            trace.outcome.ok().and_then(|o| o.pointer("/error/message").cloned()),
            Some(json!("A valid accountID is required to fetch or receive a live container version."))
        );

        let trace = trace_routine(fetch(&[json!("100"), json!(0)]), |_| None);
        assert_eq!(
            trace.outcome.ok().and_then(|o| o.pointer("/error/message").cloned()),
            Some(json!("A valid internalContainerID is required to fetch or receive a live container version."))
        );
    }

    #[test]
    fn resolver_fetches_for_valid_ids_only() {
        let store = tagmanager_store();
        let resolver = &store.resolvers["getLiveContainerVersion"];

        let skipped = trace_routine(resolver.routine(&[json!("100")]), |_| None);
        assert!(skipped.selects.is_empty());

        let trace = trace_routine(resolver.routine(&[json!("100"), json!("200")]), |action| {
            (action.kind == "FETCH_GET_LIVE_CONTAINER_VERSION").then(|| Ok(json!({ "containerVersionId": "3" })))
        });
        assert_eq!(trace.selects, ["getLiveContainerVersion"]);
        assert_eq!(
            trace.kinds(),
            [
                "START_FETCH_GET_LIVE_CONTAINER_VERSION",
                "FETCH_GET_LIVE_CONTAINER_VERSION",
                "RECEIVE_GET_LIVE_CONTAINER_VERSION",
                "FINISH_FETCH_GET_LIVE_CONTAINER_VERSION",
            ]
        );
    }

    #[test]
    fn is_doing_tracks_each_container() {
        let store = tagmanager_store();
        let start = sitekit_data_core::Action::new(
            "START_FETCH_GET_LIVE_CONTAINER_VERSION",
            json!({ "params": { "accountID": "100", "internalContainerID": "200" } }),
        );
        let state = store.reducer.reduce(store.initial_state.clone(), &start);

        let is_doing = &store.selectors["isDoingGetLiveContainerVersion"];
        assert_eq!(is_doing.select(&state, &[json!("100"), json!("200")]), json!(true));
        assert_eq!(is_doing.select(&state, &[json!("100"), json!("300")]), json!(false));
    }
}
