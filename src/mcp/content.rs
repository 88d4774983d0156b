//! Tool-call reply shaping.
//!
//! `tools/call` replies are not raw service results: MCP expects a list of
//! content blocks plus an `isError` flag. Service failures become in-band
//! errors (`isError: true`) while the JSON-RPC envelope still reports success.
//!
//! Image payloads are detected structurally: any successful result carrying a
//! string `base64_data` field is emitted as an image block followed by a
//! textual descriptor.

use serde::Serialize;
use serde_json::Value;

use crate::mcp::protocol::{JsonRpcResponse, RequestId, ResponsePayload};

/// MIME type attached to image blocks.
pub const IMAGE_MIME_TYPE: &str = "image/png";

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Base64-encoded image content.
    Image {
        /// Base64 payload.
        data: String,
        /// MIME type of the decoded payload.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Creates an image result with a dimension descriptor.
    #[must_use]
    pub fn image(data: impl Into<String>, width: i64, height: i64) -> Self {
        Self {
            content: vec![
                ToolContent::Image {
                    data: data.into(),
                    mime_type: IMAGE_MIME_TYPE.to_string(),
                },
                ToolContent::Text {
                    text: format!("Screenshot captured: {width}x{height}"),
                },
            ],
            is_error: false,
        }
    }
}

/// Wraps a raw service response into a `tools/call` reply.
///
/// `prefix` and `method` only feed diagnostics. The returned envelope is
/// always a success carrying `id`, whatever id the service put on `response`.
#[must_use]
pub fn shape_tool_response(
    id: Option<RequestId>,
    response: JsonRpcResponse,
    prefix: &str,
    method: &str,
) -> JsonRpcResponse {
    let shaped = match &response.payload {
        ResponsePayload::Result(result) => shape_success(result),
        ResponsePayload::Error(error) => {
            tracing::debug!(
                tool = %format_args!("{prefix}/{method}"),
                code = error.code,
                "Tool call failed"
            );
            if error.message.is_empty() {
                ToolCallResult::error("Unknown error")
            } else {
                ToolCallResult::error(error.message.clone())
            }
        }
    };

    let value = match serde_json::to_value(&shaped) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            return JsonRpcResponse::internal_error(id, "failed to serialise tool call result");
        }
    };

    JsonRpcResponse::success(id, value)
}

fn shape_success(result: &Value) -> ToolCallResult {
    if let Some(data) = result.get("base64_data").and_then(Value::as_str) {
        return ToolCallResult::image(data, dimension(result, "width"), dimension(result, "height"));
    }

    match serde_json::to_string_pretty(result) {
        Ok(text) => ToolCallResult::text(text),
        Err(e) => ToolCallResult::error(format!("Failed to format result: {e}")),
    }
}

#[allow(clippy::cast_possible_truncation)] // fractional sizes are truncated like the integer fields
fn dimension(result: &Value, key: &str) -> i64 {
    result
        .get(key)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
        .unwrap_or(0)
}
