// SPDX-FileCopyrightText: 2026 Galaxy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `HttpKubeApi` against a mock API server.

use std::time::Duration;

use galaxy_bridge::{HttpKubeApi, KubeApi, KubeRequest, KubeResponse};
use galaxy_core::{GalaxyError, HttpMethod};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn call(api: HttpKubeApi, request: KubeRequest) -> Result<KubeResponse, GalaxyError> {
    tokio::task::spawn_blocking(move || api.call(&request))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn get_sends_bearer_token_and_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/namespaces"))
        .and(header("authorization", "Bearer sa-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "NamespaceList"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpKubeApi::new(server.uri(), Some("sa-token".into()), Duration::from_secs(5)).unwrap();
    let response = call(api, KubeRequest::get("/api/v1/namespaces")).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body["kind"], "NamespaceList");
}

#[tokio::test(flavor = "multi_thread")]
async fn request_body_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/apis/apps/v1/namespaces/default/deployments/web"))
        .and(body_json(json!({"spec": {"replicas": 3}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpKubeApi::new(server.uri(), None, Duration::from_secs(5)).unwrap();
    let request = KubeRequest {
        method: HttpMethod::Patch,
        path: "/apis/apps/v1/namespaces/default/deployments/web".into(),
        body: Some(json!({"spec": {"replicas": 3}})),
    };
    let response = call(api, request).await.unwrap();
    assert_eq!(response.body["ok"], true);
}

#[tokio::test(flavor = "multi_thread")]
async fn error_status_and_text_body_are_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/secrets"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let api = HttpKubeApi::new(server.uri(), None, Duration::from_secs(5)).unwrap();
    let response = call(api, KubeRequest::get("/api/v1/secrets")).await.unwrap();
    assert_eq!(response.status, 403);
    assert_eq!(response.body, json!("forbidden"));
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let api = HttpKubeApi::new(server.uri(), None, Duration::from_millis(200)).unwrap();
    let err = call(api, KubeRequest::get("/version")).await.unwrap_err();
    assert!(matches!(err, GalaxyError::Timeout { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn encoded_traversal_never_reaches_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/secrets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"kind": "SecretList"})))
        .expect(0)
        .mount(&server)
        .await;

    let api = HttpKubeApi::new(server.uri(), None, Duration::from_secs(5)).unwrap();
    let err = call(api, KubeRequest::get("/api/v1/pods/%2e%2e/secrets"))
        .await
        .unwrap_err();
    assert!(matches!(err, GalaxyError::Internal(_)));
}
