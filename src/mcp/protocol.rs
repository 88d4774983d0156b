//! JSON-RPC 2.0 message types for MCP protocol.
//!
//! This module defines the core message types used in the Model Context Protocol.
//! All messages follow the JSON-RPC 2.0 specification with MCP-specific extensions.
//!
//! # Message Types
//!
//! - **Request**: an inbound frame. It may carry an `id`; frames without one
//!   are notifications but are still answered with an envelope, because the
//!   HTTP transports always owe the client exactly one response.
//! - **Response**: a reply carrying exactly one of `result` or `error`.
//!
//! # Id Handling
//!
//! Ids are carried as a tagged union and never normalised: a numeric id is
//! echoed as a JSON number, a string id as a JSON string, and a missing id as
//! `null`. Some clients key their pending-reply tables by exact JSON type.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// The JSON-RPC version every frame must declare.
pub const JSONRPC_VERSION: &str = "2.0";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "host-bridge-mcp";

/// A JSON-RPC 2.0 request ID.
///
/// Per the MCP specification, IDs must be strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// A decoded JSON-RPC 2.0 request.
///
/// Built once per inbound frame and never mutated afterwards. Missing
/// `jsonrpc`/`method` fields decode as empty strings so the router can
/// classify them; missing `params` decode as an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    /// Should be "2.0"; anything else is rejected by the router.
    pub jsonrpc: String,

    /// Request identifier, `None` for notifications.
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Parameters for the method.
    pub params: Map<String, Value>,
}

impl JsonRpcRequest {
    /// Creates a well-formed request.
    #[must_use]
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Returns a copy of this request addressed to another method with other params.
    ///
    /// The id and protocol version are preserved, which is what `tools/call`
    /// needs when it re-dispatches its `arguments` to a service.
    #[must_use]
    pub fn redirect(&self, method: impl Into<String>, params: Map<String, Value>) -> Self {
        Self {
            jsonrpc: self.jsonrpc.clone(),
            id: self.id.clone(),
            method: method.into(),
            params,
        }
    }

    /// Returns `true` if the request carries no id.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Returns a string parameter, if present.
    #[must_use]
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    /// Returns an integer parameter, if present.
    #[must_use]
    pub fn i64_param(&self, key: &str) -> Option<i64> {
        self.params.get(key).and_then(Value::as_i64)
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// Server-defined error.
    ServerError(i32),
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(code) => code,
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ServerError(_) => "Server error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }

    /// Creates a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Adds additional data to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// The mutually exclusive body of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    /// Successful result object.
    Result(Value),
    /// Error object.
    Error(JsonRpcErrorData),
}

/// A JSON-RPC 2.0 response.
///
/// The payload enum guarantees that exactly one of `result` or `error` is
/// present on the wire. The id is always serialised, as `null` when absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to (`null` if unknown).
    pub id: Option<RequestId>,

    /// Result or error.
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: ResponsePayload::Result(result),
        }
    }

    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn error(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    /// Creates a parse error response (ID cannot be determined).
    #[must_use]
    pub fn parse_error() -> Self {
        Self::error(
            None,
            JsonRpcErrorData::with_message(ErrorCode::ParseError, "Parse error: Invalid JSON"),
        )
    }

    /// Creates an invalid request error response.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, reason: &str) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::InvalidRequest,
                format!("Invalid Request: {reason}"),
            ),
        )
    }

    /// Creates a method-not-found error naming the service and method.
    #[must_use]
    pub fn method_not_found(id: Option<RequestId>, service: &str, method: &str) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                format!("Method not found: {service}/{method}"),
            )
            .with_data(json!({ "service": service, "method": method })),
        )
    }

    /// Creates an invalid params error response.
    #[must_use]
    pub fn invalid_params(id: Option<RequestId>, reason: &str) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::InvalidParams,
                format!("Invalid params: {reason}"),
            ),
        )
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal_error(id: Option<RequestId>, message: &str) -> Self {
        Self::error(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::InternalError,
                format!("Internal error: {message}"),
            ),
        )
    }

    /// Returns `true` if this is a success response.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.payload, ResponsePayload::Result(_))
    }

    /// Returns the result value of a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.payload {
            ResponsePayload::Result(value) => Some(value),
            ResponsePayload::Error(_) => None,
        }
    }

    /// Returns the error object of a failed response.
    #[must_use]
    pub const fn error_data(&self) -> Option<&JsonRpcErrorData> {
        match &self.payload {
            ResponsePayload::Result(_) => None,
            ResponsePayload::Error(error) => Some(error),
        }
    }

    /// Returns `true` if this response reports malformed JSON.
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        self.error_data()
            .is_some_and(|e| e.code == ErrorCode::ParseError.code())
    }
}

/// Decodes a JSON-RPC request frame.
///
/// # Errors
///
/// Returns a ready-to-send error response:
/// - `-32700` if the body is not valid JSON or not a JSON object
/// - `-32600` if `id` is neither a string nor an integer, or `params` is not an object
pub fn parse_request(json: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcResponse::parse_error())?;

    let Value::Object(mut obj) = value else {
        return Err(JsonRpcResponse::parse_error());
    };

    let id = match obj.remove("id") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(RequestId::String(s)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(n) => Some(RequestId::Number(n)),
            None => {
                return Err(JsonRpcResponse::invalid_request(
                    None,
                    "id must be a string or an integer",
                ))
            }
        },
        Some(_) => {
            return Err(JsonRpcResponse::invalid_request(
                None,
                "id must be a string or an integer",
            ))
        }
    };

    let jsonrpc = take_string(&mut obj, "jsonrpc");
    let method = take_string(&mut obj, "method");

    let params = match obj.remove("params") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(params)) => params,
        Some(_) => {
            return Err(JsonRpcResponse::invalid_request(
                id,
                "params must be an object",
            ))
        }
    };

    Ok(JsonRpcRequest {
        jsonrpc,
        id,
        method,
        params,
    })
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> String {
    match obj.remove(key) {
        Some(Value::String(s)) => s,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let req = parse_request(json).unwrap();

        assert_eq!(req.id, Some(RequestId::Number(1)));
        assert_eq!(req.method, "initialize");
        assert!(req.params.is_empty());
    }

    #[test]
    fn parse_notification_has_no_id() {
        let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let req = parse_request(json).unwrap();

        assert!(req.is_notification());
        assert_eq!(req.method, "notifications/initialized");
    }

    #[test]
    fn parse_string_id() {
        let json = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "test"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.id, Some(RequestId::String("abc-123".to_string())));
    }

    #[test]
    fn parse_null_id_is_absent() {
        let json = r#"{"jsonrpc": "2.0", "id": null, "method": "test"}"#;
        let req = parse_request(json).unwrap();
        assert!(req.id.is_none());
    }

    #[test]
    fn parse_invalid_json() {
        let err = parse_request("not valid json").unwrap_err();
        assert!(err.is_parse_error());
        assert!(err.id.is_none());
    }

    #[test]
    fn parse_non_object_is_parse_error() {
        let err = parse_request("[1, 2, 3]").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn parse_missing_jsonrpc_is_deferred_to_router() {
        let json = r#"{"id": 1, "method": "test"}"#;
        let req = parse_request(json).unwrap();
        assert_eq!(req.jsonrpc, "");
    }

    #[test]
    fn parse_fractional_id_is_invalid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 1.5, "method": "test"}"#;
        let err = parse_request(json).unwrap_err();
        assert_eq!(
            err.error_data().unwrap().code,
            ErrorCode::InvalidRequest.code()
        );
        assert!(err.id.is_none());
    }

    #[test]
    fn parse_array_params_is_invalid_request() {
        let json = r#"{"jsonrpc": "2.0", "id": 7, "method": "test", "params": [1]}"#;
        let err = parse_request(json).unwrap_err();
        assert_eq!(
            err.error_data().unwrap().code,
            ErrorCode::InvalidRequest.code()
        );
        assert_eq!(err.id, Some(RequestId::Number(7)));
    }

    #[test]
    fn serialise_success_response() {
        let response =
            JsonRpcResponse::success(Some(RequestId::Number(1)), json!({"ok": true}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""id":1"#));
        assert!(json.contains(r#""result":{"ok":true}"#));
        assert!(!json.contains("error"));
    }

    #[test]
    fn serialise_error_response() {
        let error =
            JsonRpcResponse::method_not_found(Some(RequestId::Number(1)), "unknown", "method");
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 1);
        assert_eq!(value["error"]["code"], -32601);
        assert_eq!(value["error"]["data"]["service"], "unknown");
        assert!(value.get("result").is_none());
    }

    #[test]
    fn serialise_missing_id_as_null() {
        let value = serde_json::to_value(JsonRpcResponse::parse_error()).unwrap();
        assert!(value["id"].is_null());
        assert_eq!(value["error"]["code"], -32700);
    }

    #[test]
    fn zero_id_stays_numeric() {
        let req = parse_request(r#"{"jsonrpc":"2.0","id":0,"method":"ping"}"#).unwrap();
        let response = JsonRpcResponse::success(req.id, json!({}));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""id":0"#));
        assert!(!json.contains(r#""id":"0""#));
    }

    #[test]
    fn redirect_keeps_id() {
        let req = JsonRpcRequest::new(Some("t".into()), "tools/call", Map::new());
        let mut args = Map::new();
        args.insert("msg".to_string(), json!("hi"));
        let inner = req.redirect("beta/echo", args);
        assert_eq!(inner.id, Some(RequestId::String("t".to_string())));
        assert_eq!(inner.str_param("msg"), Some("hi"));
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
