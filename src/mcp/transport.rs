//! HTTP transport for the MCP server.
//!
//! Two MCP transports are served side by side:
//!
//! - **Streamable HTTP**: `POST /mcp` takes one JSON-RPC frame and answers it
//!   in the response body.
//! - **Legacy SSE**: `GET /sse` returns a single `endpoint` event naming the
//!   message URL (`/message?sessionId=…`), which the client then POSTs to.
//!   `POST /sse` and `POST /message` are aliases of `POST /mcp`.
//!
//! `GET /health` reports liveness and every route answers `OPTIONS`
//! preflights. All responses carry permissive CORS headers.
//!
//! # Threading
//!
//! Handlers run on the transport's worker pool. Parsing and serialisation
//! happen there; routing is marshalled onto the host's main thread through
//! the [`MainThreadDispatcher`] and the handler resumes only to serialise
//! the reply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{
    HeaderName, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, CACHE_CONTROL, CONNECTION, CONTENT_TYPE,
};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::activity::ActivityClock;
use crate::dispatch::MainThreadDispatcher;
use crate::mcp::protocol::{parse_request, JsonRpcResponse};
use crate::mcp::router::RequestRouter;

/// Request bodies longer than this are truncated in debug logs.
const LOG_BODY_LIMIT: usize = 1000;

/// Preflight cache lifetime, in seconds.
const PREFLIGHT_MAX_AGE: &str = "86400";

/// Sent when a response cannot be serialised.
const SERIALISATION_FAILURE_BODY: &str = r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal error: failed to serialise response"}}"#;

const APPLICATION_JSON: &str = "application/json";

/// Shared state of the HTTP front-end.
#[derive(Debug, Clone)]
pub struct TransportState {
    /// Request router, only ever invoked on the main thread.
    pub router: Arc<RequestRouter>,
    /// Marshals routing onto the host's main thread.
    pub dispatcher: MainThreadDispatcher,
    /// Last-request timestamp.
    pub activity: Arc<ActivityClock>,
    /// Host name written into SSE endpoint URLs.
    pub advertised_host: String,
    /// Port the listener is bound to.
    pub port: u16,
    /// Whether the owning server considers itself running.
    pub running: Arc<AtomicBool>,
}

/// Optional query parameters of the message endpoints.
#[derive(Debug, Default, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Builds the axum application serving every MCP route.
pub fn app(state: TransportState) -> Router {
    Router::new()
        .route("/mcp", post(handle_message).options(handle_preflight))
        .route("/message", post(handle_message).options(handle_preflight))
        .route(
            "/sse",
            get(handle_sse).post(handle_message).options(handle_preflight),
        )
        .route("/health", get(handle_health).options(handle_preflight))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("GET, POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Accept, Authorization"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Formats the message endpoint URL advertised to an SSE client.
#[must_use]
pub fn message_endpoint_url(host: &str, port: u16, session_id: &str) -> String {
    format!("http://{host}:{port}/message?sessionId={session_id}")
}

/// Formats the single SSE frame sent on handshake.
#[must_use]
pub fn endpoint_event(url: &str) -> String {
    format!("event: endpoint\ndata: {url}\n\n")
}

async fn handle_message(
    State(state): State<Arc<TransportState>>,
    query: Option<Query<MessageQuery>>,
    body: Bytes,
) -> Response {
    match query {
        Some(Query(MessageQuery {
            session_id: Some(session_id),
        })) => tracing::debug!(session_id = %session_id, "Message for SSE session"),
        Some(_) => {}
        None => tracing::debug!("Ignoring unparseable query string"),
    }

    state.activity.record();

    let Ok(text) = std::str::from_utf8(&body) else {
        tracing::warn!("Request body is not valid UTF-8");
        return json_response(StatusCode::BAD_REQUEST, &JsonRpcResponse::parse_error());
    };

    if text.trim().is_empty() {
        let status = json!({ "status": "ready", "server": state.router.server_info().name });
        return (StatusCode::OK, [(CONTENT_TYPE, APPLICATION_JSON)], status.to_string())
            .into_response();
    }

    tracing::debug!(body = %truncate_for_log(text), "Received request");

    let request = match parse_request(text) {
        Ok(request) => request,
        Err(error) => {
            let status = if error.is_parse_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::OK
            };
            tracing::debug!(status = %status, "Rejected malformed request");
            return json_response(status, &error);
        }
    };

    let id = request.id.clone();
    let router = Arc::clone(&state.router);
    let response = match state
        .dispatcher
        .run_on_main_async(move || router.route(&request))
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to run request on the main thread");
            JsonRpcResponse::internal_error(id, &e.to_string())
        }
    };

    json_response(StatusCode::OK, &response)
}

async fn handle_sse(State(state): State<Arc<TransportState>>) -> Response {
    state.activity.record();

    let session_id = Uuid::new_v4().to_string();
    let url = message_endpoint_url(&state.advertised_host, state.port, &session_id);
    tracing::info!(session_id = %session_id, endpoint = %url, "SSE handshake");

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/event-stream"),
            (CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (CONNECTION, "keep-alive"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        endpoint_event(&url),
    )
        .into_response()
}

async fn handle_health(State(state): State<Arc<TransportState>>) -> Response {
    let info = state.router.server_info();
    let body = json!({
        "status": "healthy",
        "server": info.name,
        "version": info.version,
        "port": state.port,
        "running": state.running.load(Ordering::Relaxed),
    });

    (StatusCode::OK, [(CONTENT_TYPE, APPLICATION_JSON)], body.to_string()).into_response()
}

async fn handle_preflight() -> Response {
    (
        StatusCode::NO_CONTENT,
        [(ACCESS_CONTROL_MAX_AGE, PREFLIGHT_MAX_AGE)],
    )
        .into_response()
}

fn json_response(status: StatusCode, response: &JsonRpcResponse) -> Response {
    match serde_json::to_string(response) {
        Ok(body) => (status, [(CONTENT_TYPE, APPLICATION_JSON)], body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialise response");
            (
                StatusCode::OK,
                [(CONTENT_TYPE, APPLICATION_JSON)],
                SERIALISATION_FAILURE_BODY,
            )
                .into_response()
        }
    }
}

fn truncate_for_log(text: &str) -> &str {
    match text.char_indices().nth(LOG_BODY_LIMIT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
