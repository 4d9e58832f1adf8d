//! `modules/adsense`: account alerts

use crate::validation::{id_segment, is_truthy, is_valid_adsense_account_id};
use serde_json::{Map, Value, json};
use sitekit_data_core::error::require;
use sitekit_data_core::routine::{Step, select_then, sequence};
use sitekit_data_core::{
    Action, Api, ApiRequest, FetchStoreDescriptor, Params, Routine, State, StoreError, StoreFragment,
    combine_stores, create_fetch_store,
};
use std::sync::Arc;

/// Registry name of the store
pub const STORE_NAME: &str = "modules/adsense";

/// Clears loaded alerts and resets the setup status in `settings`
pub const RESET_ALERTS: &str = "RESET_ALERTS";

const SETUP_STATUS_KEYS: [&str; 4] = [
    "accountStatus",
    "siteStatus",
    "accountSetupComplete",
    "siteSetupComplete",
];

fn alerts_for(state: &State, account_id: &Value) -> Value {
    state
        .get("alerts")
        .and_then(|alerts| alerts.get(id_segment(account_id)))
        .cloned()
        .unwrap_or(Value::Null)
}

fn reduce_reset_alerts(mut state: State, action: &Action) -> State {
    if action.kind != RESET_ALERTS {
        return state;
    }

    let saved = state.get("savedSettings").cloned().unwrap_or(Value::Null);
    let mut settings = state
        .get("settings")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    for key in SETUP_STATUS_KEYS {
        settings.insert(key.to_string(), saved.get(key).cloned().unwrap_or(Value::Null));
    }

    state.insert("alerts".to_string(), json!({}));
    state.insert("settings".to_string(), Value::Object(settings));
    state
}

/// Build the `modules/adsense` store.
///
/// - `getAlerts(accountID)` returns the alerts of an account, `null` until
///   loaded; the resolver fetches them for valid `pub-…` IDs only
/// - `resetAlerts()` drops every loaded alert and invalidates the
///   `getAlerts` resolution so the next read fetches again
///
/// # Errors
///
/// Only if fragment names collide, which would be a wiring bug.
pub fn store(api: Arc<dyn Api>) -> Result<StoreFragment, StoreError> {
    let fetch_get_alerts = create_fetch_store(
        FetchStoreDescriptor::new("getAlerts")
            .issue_request(move |params: Params| {
                api.call(ApiRequest::get("modules", "adsense", "alerts").with_data(params))
            })
            .reduce_response(|mut state, alerts, params| {
                let account_id = params.get("accountID").map(id_segment).unwrap_or_default();
                let mut by_account = state
                    .remove("alerts")
                    .and_then(|alerts| match alerts {
                        Value::Object(map) => Some(map),
                        _ => None,
                    })
                    .unwrap_or_else(Map::new);
                by_account.insert(account_id, alerts);
                state.insert("alerts".to_string(), Value::Object(by_account));
                state
            })
            .normalize_args(|args: &[Value]| {
                let account_id = args.first().cloned().unwrap_or(Value::Null);
                require(is_truthy(&account_id), "accountID is required.")?;

                let mut params = Params::new();
                params.insert("accountID".to_string(), account_id);
                Ok(params)
            }),
    )?;

    let resolve_alerts = fetch_get_alerts.clone();

    let base = StoreFragment::new()
        .with_initial_state("alerts", json!({}))
        .with_routine_action("resetAlerts", |_| {
            sequence(vec![
                Step::Yield(Action::bare(RESET_ALERTS)),
                Step::Invalidate {
                    selector: "getAlerts".to_string(),
                },
            ])
        })
        .with_reducer(reduce_reset_alerts)
        .with_selector("getAlerts", |state, args| match args.first() {
            None | Some(Value::Null) => Value::Null,
            Some(account_id) => alerts_for(state, account_id),
        })
        .with_resolver("getAlerts", move |args| {
            let account_id = args.first().cloned().unwrap_or(Value::Null);
            if !is_valid_adsense_account_id(&account_id) {
                return sequence(vec![]);
            }

            let fetch = resolve_alerts.clone();
            select_then("getAlerts", vec![account_id.clone()], move |existing| {
                existing
                    .is_null()
                    .then(|| Box::new(fetch.fetch(vec![account_id])) as Box<dyn Routine>)
            })
        });

    combine_stores([fetch_get_alerts.fragment(), base])
}
