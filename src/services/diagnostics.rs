//! Diagnostics service.
//!
//! A small service that exercises every path of the core: plain results,
//! parameter validation, host state read on the main thread, and image
//! payloads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::service::{McpService, ToolDescriptor};

/// Prefix the service is registered under by the demo host.
pub const DIAGNOSTICS_PREFIX: &str = "diagnostics";

/// A 1×1 greyscale PNG.
const SWATCH_PNG: [u8; 68] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5,
    0x1c, 0x0c, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64,
    0x60, 0x00, 0x00, 0x00, 0x06, 0x00, 0x02, 0x30, 0x81, 0xd0, 0x2f, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

/// Liveness, echo, host tick counter and a sample image.
#[derive(Debug)]
pub struct DiagnosticsService {
    ticks: Arc<AtomicU64>,
    started: DateTime<Utc>,
}

impl DiagnosticsService {
    /// Creates the service reading the host's frame counter from `ticks`.
    #[must_use]
    pub fn new(ticks: Arc<AtomicU64>) -> Self {
        Self {
            ticks,
            started: Utc::now(),
        }
    }

    fn ping(request: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(
            request.id.clone(),
            json!({ "pong": true, "timestamp": Utc::now().to_rfc3339() }),
        )
    }

    fn echo(request: &JsonRpcRequest) -> JsonRpcResponse {
        if request.str_param("msg").is_none() {
            return JsonRpcResponse::invalid_params(
                request.id.clone(),
                "missing required string parameter 'msg'",
            );
        }
        JsonRpcResponse::success(request.id.clone(), Value::Object(request.params.clone()))
    }

    fn host_ticks(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let uptime = Utc::now().signed_duration_since(self.started);
        JsonRpcResponse::success(
            request.id.clone(),
            json!({
                "ticks": self.ticks.load(Ordering::Relaxed),
                "uptime_seconds": uptime.num_seconds(),
            }),
        )
    }

    fn swatch(request: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(
            request.id.clone(),
            json!({
                "base64_data": BASE64_STANDARD.encode(SWATCH_PNG),
                "width": 1,
                "height": 1,
                "format": "png",
            }),
        )
    }
}

impl McpService for DiagnosticsService {
    fn handle(&self, request: &JsonRpcRequest, method: &str) -> JsonRpcResponse {
        match method {
            "ping" => Self::ping(request),
            "echo" => Self::echo(request),
            "host_ticks" => self.host_ticks(request),
            "swatch" => Self::swatch(request),
            _ => JsonRpcResponse::method_not_found(request.id.clone(), DIAGNOSTICS_PREFIX, method),
        }
    }

    fn describe(&self) -> String {
        "Host diagnostics: liveness, echo, frame counter and a sample image".to_string()
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new("ping", "Check that the host answers on its main thread"),
            ToolDescriptor::new("echo", "Return the arguments unchanged")
                .required_param("msg", "string", "Message to echo back"),
            ToolDescriptor::new(
                "host_ticks",
                "Number of frames the host has run and seconds since the service started",
            ),
            ToolDescriptor::new("swatch", "Capture a 1x1 sample image"),
        ]
    }
}
