//! Contract Test: 死活確認（GET /v1/chat/completions）とモデル一覧（GET /v1/models）

mod support;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use support::http::{spawn_proxy, test_config};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

#[tokio::test]
async fn test_probe_reports_config_without_touching_backend() {
    let mock = MockServer::start().await;
    let proxy = spawn_proxy(test_config(&mock.uri(), true)).await;

    let response = Client::new()
        .get(format!("{}/v1/chat/completions", proxy.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "ok": true,
            "note": "Use POST /v1/chat/completions. Proxy is alive.",
            "default_model": "qwen3:8b",
            "auto_pull": true
        })
    );
    assert!(mock.received_requests().await.unwrap().is_empty());

    proxy.stop().await;
}

#[tokio::test]
async fn test_models_relays_upstream_list() {
    let mock = MockServer::start().await;
    let upstream = json!({
        "object": "list",
        "data": [
            {"id": "llama3:8b", "object": "model", "created": 0, "owned_by": "library"},
            {"id": "qwen3:8b", "object": "model", "created": 0, "owned_by": "library"}
        ]
    });
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream.clone()))
        .expect(1)
        .mount(&mock)
        .await;

    let proxy = spawn_proxy(test_config(&mock.uri(), false)).await;
    let response = Client::new()
        .get(format!("{}/v1/models", proxy.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, upstream);

    proxy.stop().await;
}

#[tokio::test]
async fn test_models_falls_back_to_default_model_on_error_status() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock)
        .await;

    let proxy = spawn_proxy(test_config(&mock.uri(), false)).await;
    let response = Client::new()
        .get(format!("{}/v1/models", proxy.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "object": "list",
            "data": [{"id": "qwen3:8b", "object": "model", "owned_by": "ollama"}]
        })
    );

    proxy.stop().await;
}

#[tokio::test]
async fn test_models_falls_back_when_backend_unreachable() {
    let proxy = spawn_proxy(test_config("http://127.0.0.1:9", false)).await;

    let response = Client::new()
        .get(format!("{}/v1/models", proxy.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"][0]["id"], "qwen3:8b");

    proxy.stop().await;
}

#[tokio::test]
async fn test_post_models_is_proxied_not_listed() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(405).set_body_string("method not allowed"))
        .expect(1)
        .mount(&mock)
        .await;

    let proxy = spawn_proxy(test_config(&mock.uri(), false)).await;
    let response = Client::new()
        .post(format!("{}/v1/models", proxy.url()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.text().await.unwrap(), "method not allowed");

    proxy.stop().await;
}
