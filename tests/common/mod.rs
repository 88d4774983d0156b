//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use serde_json::json;

use host_bridge_mcp::activity::ActivityClock;
use host_bridge_mcp::dispatch::{main_thread, MainThreadDispatcher};
use host_bridge_mcp::mcp::prompts::{PromptCatalog, PromptTemplate};
use host_bridge_mcp::mcp::protocol::{JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse};
use host_bridge_mcp::mcp::router::RequestRouter;
use host_bridge_mcp::mcp::service::{McpService, ServiceRegistry, ToolDescriptor};
use host_bridge_mcp::mcp::transport::TransportState;

pub const INSTRUCTIONS: &str = "Call alpha/ping first.";

/// Service with a single `ping` tool.
pub struct Alpha;

impl McpService for Alpha {
    fn handle(&self, request: &JsonRpcRequest, method: &str) -> JsonRpcResponse {
        match method {
            "ping" => JsonRpcResponse::success(request.id.clone(), json!({ "pong": true })),
            _ => JsonRpcResponse::method_not_found(request.id.clone(), "alpha", method),
        }
    }

    fn describe(&self) -> String {
        "Alpha".to_string()
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new("ping", "Liveness check")]
    }
}

/// Service whose `echo` tool returns its params.
pub struct Beta;

impl McpService for Beta {
    fn handle(&self, request: &JsonRpcRequest, method: &str) -> JsonRpcResponse {
        match method {
            "echo" if request.str_param("msg").is_some() => JsonRpcResponse::success(
                request.id.clone(),
                serde_json::Value::Object(request.params.clone()),
            ),
            "echo" => JsonRpcResponse::invalid_params(request.id.clone(), "missing 'msg'"),
            "fail" => JsonRpcResponse::error(
                request.id.clone(),
                JsonRpcErrorData {
                    code: -32000,
                    message: "Object not found".to_string(),
                    data: None,
                },
            ),
            _ => JsonRpcResponse::method_not_found(request.id.clone(), "beta", method),
        }
    }

    fn describe(&self) -> String {
        "Beta".to_string()
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![ToolDescriptor::new("echo", "Echo the message")
            .required_param("msg", "string", "Message to echo")]
    }
}

/// Service returning an image payload; advertises no tools.
pub struct Camera;

impl McpService for Camera {
    fn handle(&self, request: &JsonRpcRequest, _method: &str) -> JsonRpcResponse {
        JsonRpcResponse::success(
            request.id.clone(),
            json!({ "base64_data": "AAA=", "width": 4, "height": 3 }),
        )
    }

    fn describe(&self) -> String {
        "Camera".to_string()
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        Vec::new()
    }
}

/// Router with `alpha`, `beta` and `camera` registered.
pub fn router() -> RequestRouter {
    let mut registry = ServiceRegistry::new();
    registry.register("alpha", Arc::new(Alpha)).unwrap();
    registry.register("beta", Arc::new(Beta)).unwrap();
    registry.register("camera", Arc::new(Camera)).unwrap();

    RequestRouter::new(Arc::new(registry), INSTRUCTIONS).with_prompts(
        PromptCatalog::new().with_prompt(
            PromptTemplate::new("find_object", "Find '{search_term}'.").with_argument("search_term"),
        ),
    )
}

/// Spawns a thread acting as the host's main thread.
///
/// The thread serves the queue until every dispatcher clone is dropped.
pub fn spawn_main() -> (MainThreadDispatcher, thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let (dispatcher, mut queue) = main_thread();
        tx.send(dispatcher).unwrap();
        queue.run();
    });
    (rx.recv().unwrap(), handle)
}

/// Transport state wired to a freshly spawned main thread.
pub fn transport_state(port: u16) -> TransportState {
    let (dispatcher, _main) = spawn_main();
    TransportState {
        router: Arc::new(router()),
        dispatcher,
        activity: Arc::new(ActivityClock::new()),
        advertised_host: "localhost".to_string(),
        port,
        running: Arc::new(AtomicBool::new(true)),
    }
}
