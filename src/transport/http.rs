//! Streamable HTTP transport in stateless mode.
//!
//! `POST /mcp` carries one JSON-RPC message per request and is answered
//! with plain JSON. There is no server-initiated stream, so `GET /mcp` is
//! refused.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::context::ToolContext;
use crate::server::{JsonRpcResponse, SERVER_NAME, SERVER_VERSION};
use crate::tools::ToolRegistry;
use crate::transport::session::EphemeralSession;

const MCP_PATH: &str = "/mcp";
const API_KEY_HEADER: &str = "x-api-key";

type ReleaseHook = Arc<dyn Fn() + Send + Sync>;

/// Shared state of the HTTP transport.
#[derive(Clone)]
pub struct AppState {
    registry: Arc<ToolRegistry>,
    ctx: ToolContext,
    release_hook: Option<ReleaseHook>,
}

impl AppState {
    /// State serving `registry` with the process-wide context.
    pub fn new(registry: Arc<ToolRegistry>, ctx: ToolContext) -> Self {
        Self {
            registry,
            ctx,
            release_hook: None,
        }
    }

    /// Call `hook` every time a per-request session is released.
    pub fn with_release_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.release_hook = Some(Arc::new(hook));
        self
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(MCP_PATH, post(mcp_post).get(mcp_get))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("docstore-mcp listening on http://{}{}", addr, MCP_PATH);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "transport": "http",
    }))
}

async fn mcp_get() -> Response {
    StatusCode::METHOD_NOT_ALLOWED.into_response()
}

async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": "Not found", "path": uri.path()})),
    )
        .into_response()
}

async fn mcp_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = match request_api_key(&headers) {
        Some(key) => state.ctx.with_api_key(&key),
        None => state.ctx.clone(),
    };

    let mut session = EphemeralSession::open(Arc::clone(&state.registry), ctx);
    if let Some(hook) = state.release_hook.clone() {
        session.on_release(move || hook());
    }

    let outcome = session.exchange(&body).await;
    session.release();

    match outcome {
        Ok(Some(response)) => (StatusCode::OK, Json(response)).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "mcp exchange failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JsonRpcResponse::from_error(None, err)),
            )
                .into_response()
        }
    }
}

/// API key supplied with the request, if any.
///
/// `Authorization: Bearer <key>` wins over `X-Api-Key`. Blank values are ignored.
fn request_api_key(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
        });
    let header = || headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());

    bearer
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| header().map(str::trim).filter(|k| !k.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_api_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(request_api_key(&headers), None);

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("sk_header"));
        assert_eq!(request_api_key(&headers).as_deref(), Some("sk_header"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer sk_bearer"));
        assert_eq!(request_api_key(&headers).as_deref(), Some("sk_bearer"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(request_api_key(&headers).as_deref(), Some("sk_header"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        headers.remove(API_KEY_HEADER);
        assert_eq!(request_api_key(&headers), None);
    }
}
