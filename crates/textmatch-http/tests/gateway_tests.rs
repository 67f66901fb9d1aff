use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use textmatch_core::config::{GatewaySettings, Settings};
use textmatch_core::traits::UnitIndex;
use textmatch_http::gateway::Gateway;
use textmatch_http::router;
use textmatch_service::TextMatchService;
use textmatch_text::TantivyUnitIndex;

/// Starts a real server on an ephemeral port and returns its base URL.
async fn spawn_upstream() -> String {
    let backend: Arc<dyn UnitIndex> = Arc::new(TantivyUnitIndex::in_memory());
    let service = TextMatchService::new(backend, &Settings::default());
    service.provision(&[]).await.expect("provision");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, router(Arc::new(service))).await.expect("serve");
    });
    format!("http://{addr}")
}

fn gateway_to(upstream: String, attempts: usize) -> Gateway {
    Gateway::new(&GatewaySettings { upstream_url: upstream, timeout_ms: 2_000, attempts, ..GatewaySettings::default() })
}

async fn call(gateway: &Gateway, request: Request<Body>) -> (StatusCode, Value) {
    let response = gateway.clone().router().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

#[tokio::test]
async fn forwards_insert_and_search() {
    let gateway = gateway_to(spawn_upstream().await, 3);

    let insert = Request::builder()
        .method("POST")
        .uri("/insert")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "text": "alpha beta\ngamma alpha" }).to_string()))
        .expect("request");
    let (status, body) = call(&gateway, insert).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["indexed"], 2);

    let search = Request::builder().uri("/search?query=gamma").body(Body::empty()).expect("request");
    let (status, body) = call(&gateway, search).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches"][0]["text"], "gamma alpha");
}

#[tokio::test]
async fn relays_upstream_errors_verbatim() {
    let gateway = gateway_to(spawn_upstream().await, 3);
    let request = Request::builder().uri("/get?paragraph=").body(Body::empty()).expect("request");
    let (status, body) = call(&gateway, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "paragraph is required" }));
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = gateway_to(format!("http://{addr}"), 2);
    let request = Request::builder().uri("/search?query=alpha").body(Body::empty()).expect("request");
    let (status, body) = call(&gateway, request).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream unavailable");
}
