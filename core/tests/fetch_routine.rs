//! Fetch routines driven by the shared routine tracer.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use serde_json::{Value, json};
use sitekit_data_core::error::require;
use sitekit_data_core::{FetchOutcome, FetchStore, FetchStoreDescriptor, Params, create_fetch_store};
use sitekit_data_testing::{RoutineTrace, trace_routine};

fn get_some_data() -> FetchStore {
    create_fetch_store(
        FetchStoreDescriptor::new("getSomeData")
            .issue_request(|params: Params| async move { Ok(Value::Object(params)) })
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
    create_fetch_store(FetchStoreDescriptor::new("SaveSomeData").issue_request(|_| async { Ok(json!(true)) }))
        .unwrap()
}

/// Answer the fetch control of `store` with `response`
fn run(store: &FetchStore, args: Vec<Value>, response: Result<Value, Value>) -> RoutineTrace {
    let control = store.names().fetch.clone();
    trace_routine(Box::new(store.fetch(args)), move |action| {
        (action.kind == control).then(|| response.clone())
    })
}

#[test]
fn success_yields_four_transitions_in_order() {
    let trace = run(&save_some_data(), vec![], Ok(json!(42)));

    assert_eq!(
        trace.kinds(),
        [
            "START_FETCH_SAVE_SOME_DATA",
            "FETCH_SAVE_SOME_DATA",
            "RECEIVE_SAVE_SOME_DATA",
            "FINISH_FETCH_SAVE_SOME_DATA",
        ]
    );
    let outcome = trace.outcome.unwrap();
    assert_eq!(outcome, json!({ "response": 42 }));
    assert_eq!(FetchOutcome::from_value(&outcome), FetchOutcome::success(json!(42)));
}

#[test]
fn rejection_yields_catch() {
    let error = json!({ "code": "this-went-wrong", "message": "This went wrong." });
    let trace = run(&save_some_data(), vec![], Err(error.clone()));

    assert_eq!(
        trace.kinds(),
        ["START_FETCH_SAVE_SOME_DATA", "FETCH_SAVE_SOME_DATA", "CATCH_FETCH_SAVE_SOME_DATA"]
    );
    assert_eq!(FetchOutcome::from_value(&trace.outcome.unwrap()), FetchOutcome::failure(error));
}

#[test]
fn invalid_args_complete_without_yielding() {
    let store = get_some_data();

    for args in [vec![], vec![json!(123)], vec![json!({})]] {
        let trace = run(&store, args, Ok(json!("unused")));
        assert!(trace.actions.is_empty());

        let outcome = FetchOutcome::from_value(&trace.outcome.unwrap());
        assert_eq!(outcome.response, None);
        assert_eq!(
            outcome.error.as_ref().and_then(|e| e.get("code")),
            Some(&json!("invalid_args"))
        );
    }

    let trace = run(&store, vec![json!({})], Ok(json!("unused")));
    assert_eq!(
        trace.outcome.unwrap().pointer("/error/message"),
        Some(&json!("aParam is required."))
    );
}
