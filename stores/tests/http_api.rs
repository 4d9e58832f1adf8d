//! `HttpApi` against a local mock server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use serde_json::{Value, json};
use sitekit_data_core::{Api, ApiRequest, Params};
use sitekit_data_stores::config::ApiConfig;
use sitekit_data_stores::http::HttpApi;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ALERTS: &str = "/google-site-kit/v1/modules/adsense/data/alerts";

fn api(base_url: &str) -> HttpApi {
    HttpApi::new(ApiConfig::new(base_url).unwrap().with_nonce("abc")).unwrap()
}

fn data(value: Value) -> Params {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn get_sends_query_and_nonce() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALERTS))
        .and(query_param("accountID", "pub-1"))
        .and(header("X-WP-Nonce", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest::get("modules", "adsense", "alerts").with_data(data(json!({ "accountID": "pub-1" })));
    let response = api(&server.uri()).call(request).await;

    assert_eq!(response, Ok(json!([{ "id": 1 }])));
}

#[tokio::test]
async fn set_posts_data_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/google-site-kit/v1/core/site/data/reset"))
        .and(header("X-WP-Nonce", "abc"))
        .and(body_json(json!({ "data": { "confirm": true } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest::set("core", "site", "reset").with_data(data(json!({ "confirm": true })));
    let response = api(&server.uri()).call(request).await;

    assert_eq!(response, Ok(json!(true)));
}

#[tokio::test]
async fn error_status_without_code_becomes_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ALERTS))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let error = api(&server.uri())
        .call(ApiRequest::get("modules", "adsense", "alerts"))
        .await
        .unwrap_err();

    assert_eq!(error["code"], json!("http_error"));
    assert_eq!(error["data"]["status"], json!(500));
    assert_eq!(error["message"], json!("Request failed with status 500."));
}

#[tokio::test]
async fn error_body_with_code_is_passed_through() {
    let server = MockServer::start().await;
    let body = json!({ "code": "rest_forbidden", "message": "Sorry.", "data": { "status": 403 } });
    Mock::given(method("GET"))
        .and(path(ALERTS))
        .respond_with(ResponseTemplate::new(403).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let error = api(&server.uri())
        .call(ApiRequest::get("modules", "adsense", "alerts"))
        .await
        .unwrap_err();

    assert_eq!(error, body);
}

#[tokio::test]
async fn unreachable_host_becomes_fetch_error() {
    let error = api("http://127.0.0.1:1")
        .call(ApiRequest::get("core", "site", "connection"))
        .await
        .unwrap_err();

    assert_eq!(error["code"], json!("fetch_error"));
    assert!(error["message"].as_str().is_some_and(|m| !m.is_empty()));

    let page = api("http://127.0.0.1:1").fetch_page("http://127.0.0.1:1/").await.unwrap_err();
    assert_eq!(page["code"], json!("fetch_error"));
}

#[tokio::test]
async fn page_is_fetched_with_tagverify() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .and(query_param("tagverify", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>about</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let url = format!("{}/about", server.uri());
    let html = api(&server.uri()).fetch_page(&url).await;
    assert_eq!(html, Ok(json!("<html>about</html>")));

    let requests = server.received_requests().await.unwrap();
    let timestamp = requests[0]
        .url
        .query_pairs()
        .find(|(key, _)| key == "timestamp")
        .map(|(_, value)| value.into_owned());
    assert!(timestamp.is_some_and(|t| t.parse::<u128>().is_ok()));
}

#[tokio::test]
async fn failed_page_reads_null() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>error</html>"))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    assert_eq!(api(&server.uri()).fetch_page(&url).await, Ok(Value::Null));
}
