//! HTTP transport tests, driven through the router without a socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docstore_mcp::{router, AppState, Config, ToolContext, ToolRegistry};

fn app(base_url: &str) -> (Router, Arc<AtomicUsize>) {
    let config = Config::new("sk_process", "shop", base_url).expect("Failed to build config");
    let ctx = ToolContext::new(Arc::new(config), reqwest::Client::new());

    let releases = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&releases);
    let state = AppState::new(Arc::new(ToolRegistry::new()), ctx).with_release_hook(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (router(state), releases)
}

fn post_mcp(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> JsonValue {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, releases) = app("http://127.0.0.1:1/v1");
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"], "docstore-mcp");
    assert_eq!(body["transport"], "http");
    assert_eq!(releases.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_path_is_json_404() {
    let (app, _) = app("http://127.0.0.1:1/v1");
    let response = app
        .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Not found", "path": "/nope"})
    );
}

#[tokio::test]
async fn test_get_mcp_not_allowed() {
    let (app, _) = app("http://127.0.0.1:1/v1");
    let response = app
        .oneshot(Request::get("/mcp").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_initialize_without_session_id() {
    let (app, releases) = app("http://127.0.0.1:1/v1");
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});
    let response = app.oneshot(post_mcp(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("mcp-session-id").is_none());
    let body = json_body(response).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["serverInfo"]["name"], "docstore-mcp");
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_notification_is_accepted() {
    let (app, releases) = app("http://127.0.0.1:1/v1");
    let body = json!({"jsonrpc": "2.0", "method": "notifications/initialized"});
    let response = app.oneshot(post_mcp(body.to_string())).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.is_empty());
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let (app, releases) = app("http://127.0.0.1:1/v1");
    let response = app.oneshot(post_mcp("{\"jsonrpc\": ")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], JsonValue::Null);
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_each_request_gets_its_own_session() {
    let (app, releases) = app("http://127.0.0.1:1/v1");
    let ping = json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}).to_string();

    for _ in 0..3 {
        let response = app.clone().oneshot(post_mcp(ping.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(releases.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_tool_call_over_http() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/shop/users/u1"))
        .and(header("authorization", "Bearer sk_process"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "u1"})))
        .expect(1)
        .mount(&upstream)
        .await;

    let (app, _) = app(&format!("{}/v1", upstream.uri()));
    let body = json!({
        "jsonrpc": "2.0",
        "id": "call-1",
        "method": "tools/call",
        "params": {"name": "docstore_document_get", "arguments": {"collection": "users", "id": "u1"}}
    });
    let response = app.oneshot(post_mcp(body.to_string())).await.unwrap();

    let body = json_body(response).await;
    assert_eq!(body["id"], "call-1");
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert_eq!(serde_json::from_str::<JsonValue>(text).unwrap(), json!({"_id": "u1"}));
    assert!(body["result"].get("isError").is_none());
}

#[tokio::test]
async fn test_request_key_overrides_process_key() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/shop"))
        .and(header("authorization", "Bearer sk_caller"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["users"])))
        .expect(1)
        .mount(&upstream)
        .await;

    let (app, _) = app(&format!("{}/v1", upstream.uri()));
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": "docstore_collection_list"}
    });
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("x-api-key", "sk_caller")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let body = json_body(response).await;
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    assert_eq!(serde_json::from_str::<JsonValue>(text).unwrap(), json!(["users"]));
}
