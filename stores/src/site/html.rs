//! HTML of front-end pages, keyed by URL

use crate::validation::{id_segment, is_valid_url};
use serde_json::{Map, Value, json};
use sitekit_data_core::error::require;
use sitekit_data_core::routine::{Step, select_then, sequence};
use sitekit_data_core::{
    Action, Api, FetchStoreDescriptor, Params, Routine, State, StoreError, StoreFragment,
    combine_stores, create_fetch_store,
};
use std::sync::Arc;

/// Forgets the HTML loaded for one URL
pub const RESET_HTML_FOR_URL: &str = "RESET_HTML_FOR_URL";

fn html_for_url(state: &State, url: &Value) -> Value {
    state
        .get("htmlForURL")
        .and_then(|by_url| by_url.get(id_segment(url)))
        .cloned()
        .unwrap_or(Value::Null)
}

fn reduce_reset_html_for_url(mut state: State, action: &Action) -> State {
    if action.kind != RESET_HTML_FOR_URL {
        return state;
    }

    let url = action.payload_field("url").map(id_segment).unwrap_or_default();
    if let Some(Value::Object(by_url)) = state.get_mut("htmlForURL") {
        by_url.remove(&url);
    }
    state
}

/// `getHTMLForURL(url)` and friends.
///
/// Pages that answer with an error status are stored as `null`, so the
/// selector reads `null` after a failed load.
pub(super) fn fragment(api: Arc<dyn Api>) -> Result<StoreFragment, StoreError> {
    let fetch_get_html_for_url = create_fetch_store(
        FetchStoreDescriptor::new("getHTMLForURL")
            .issue_request(move |params: Params| {
                let url = params.get("url").and_then(Value::as_str).unwrap_or_default();
                api.fetch_page(url)
            })
            .reduce_response(|mut state, html, params| {
                let url = params.get("url").map(id_segment).unwrap_or_default();
                let mut by_url = match state.remove("htmlForURL") {
                    Some(Value::Object(map)) => map,
                    _ => Map::new(),
                };
                by_url.insert(url, html);
                state.insert("htmlForURL".to_string(), Value::Object(by_url));
                state
            })
            .normalize_args(|args: &[Value]| {
                let url = args.first().cloned().unwrap_or(Value::Null);
                require(is_valid_url(&url), "a valid url is required to fetch HTML.")?;

                let mut params = Params::new();
                params.insert("url".to_string(), url);
                Ok(params)
            }),
    )?;

    let resolve_html = fetch_get_html_for_url.clone();
    let wait_for_html = fetch_get_html_for_url.clone();

    let base = StoreFragment::new()
        .with_initial_state("htmlForURL", json!({}))
        .with_routine_action("resetHTMLForURL", |args| {
            let url = args.first().cloned().unwrap_or(Value::Null);
            sequence(vec![
                Step::Yield(Action::new(RESET_HTML_FOR_URL, json!({ "url": url }))),
                Step::Invalidate {
                    selector: "getHTMLForURL".to_string(),
                },
            ])
        })
        .with_routine_action("waitForHTMLForURL", move |args| {
            let fetch = wait_for_html.clone();
            let url = args.first().cloned().unwrap_or(Value::Null);
            select_then("getHTMLForURL", vec![url.clone()], move |existing| {
                existing
                    .is_null()
                    .then(|| Box::new(fetch.fetch(vec![url])) as Box<dyn Routine>)
            })
        })
        .with_reducer(reduce_reset_html_for_url)
        .with_selector("getHTMLForURL", |state, args| match args.first() {
            Some(url) => html_for_url(state, url),
            None => Value::Null,
        })
        .with_resolver("getHTMLForURL", move |args| {
            let url = args.first().cloned().unwrap_or(Value::Null);
            if !is_valid_url(&url) {
                return sequence(vec![]);
            }

            let fetch = resolve_html.clone();
            select_then("getHTMLForURL", vec![url.clone()], move |existing| {
                existing
                    .is_null()
                    .then(|| Box::new(fetch.fetch(vec![url])) as Box<dyn Routine>)
            })
        });

    combine_stores([fetch_get_html_for_url.fragment(), base])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sitekit_data_core::ActionCreator;
    use sitekit_data_testing::reducer_test::assertions::assert_state_key;
    use sitekit_data_testing::{MockApi, ReducerTest, trace_routine};

    const URL: &str = "https://example.com";
    const HTML: &str = "<html><head><title>Example HTML</title></head><body><h1>Example HTML H1</h1></body></html>";

    fn html_fragment() -> StoreFragment {
        fragment(Arc::new(MockApi::new())).unwrap()
    }

    #[test]
    fn receive_requires_response_and_params() {
        let store = html_fragment();
        let ActionCreator::Plain(receive) = store.actions["receiveGetHTMLForURL"].clone() else {
            unreachable!("receive is a plain action creator");
        };

        assert_eq!(receive(&[]).err().map(|e| e.to_string()), Some("response is required.".to_string()));
        assert_eq!(
            receive(&[json!("<html>")]).err().map(|e| e.to_string()),
            Some("params is required.".to_string())
        );

        let action = receive(&[json!(HTML), json!({ "url": URL })]).unwrap();
        let state = store.reducer.reduce(store.initial_state.clone(), &action);
        assert_eq!(state.get("htmlForURL"), Some(&json!({ "https://example.com": HTML })));
        assert_eq!(store.selectors["getHTMLForURL"].select(&state, &[json!(URL)]), json!(HTML));
    }

    #[test]
    fn reset_drops_one_url() {
        ReducerTest::new(reduce_reset_html_for_url)
            .given_state(json!({ "htmlForURL": { "https://example.com": HTML, "https://example.org": "<p>" } }))
            .when_action(Action::new(RESET_HTML_FOR_URL, json!({ "url": URL })))
            .then_state(|state| assert_state_key(state, "htmlForURL", &json!({ "https://example.org": "<p>" })))
            .run();
    }

    #[test]
    fn reset_invalidates_the_resolver() {
        let store = html_fragment();
        let ActionCreator::Routine(reset) = store.actions["resetHTMLForURL"].clone() else {
            unreachable!("resetHTMLForURL is a routine");
        };

        let trace = trace_routine(reset(&[json!(URL)]), |_| None);
        assert_eq!(trace.kinds(), [RESET_HTML_FOR_URL]);
        assert_eq!(trace.invalidated, ["getHTMLForURL"]);
    }

    #[test]
    fn resolver_skips_invalid_urls() {
        let store = html_fragment();

        for args in [vec![], vec![json!("not a url")], vec![json!(42)]] {
            let trace = trace_routine(store.resolvers["getHTMLForURL"].routine(&args), |_| None);
            assert!(trace.actions.is_empty());
            assert!(trace.selects.is_empty());
        }
    }

    #[test]
    fn fetch_rejects_invalid_urls() {
        let store = html_fragment();
        let ActionCreator::Routine(fetch) = store.actions["fetchGetHTMLForURL"].clone() else {
            unreachable!("fetch is a routine");
        };

        let trace = trace_routine(fetch(&[json!("example.com")]), |_| None);
        assert!(trace.actions.is_empty());
        assert_eq!(
            trace.outcome.ok().and_then(|o| o.pointer("/error/message").cloned()),
            Some(json!("a valid url is required to fetch HTML."))
        );
    }
}
