//! Request routing and protocol discovery.
//!
//! The router answers the MCP protocol methods itself and forwards everything
//! else to the service registered under the method's prefix. Routing is pure:
//! the router holds no per-request state, so the same instance serves every
//! transport.
//!
//! Precedence (first match wins):
//!
//! 1. `jsonrpc` other than `"2.0"` is rejected with `-32600`
//! 2. `initialize`
//! 3. `tools/list`
//! 4. `tools/call`
//! 5. `server/info` and `serverInfo`
//! 6. any method mentioning "instruction"
//! 7. `resources/list`
//! 8. `resources/read`
//! 9. `prompts/list`
//! 10. `prompts/get`
//! 11. `notifications/*` and `initialized`
//! 12. `ping`
//! 13. `prefix/method` service dispatch

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::mcp::content::shape_tool_response;
use crate::mcp::prompts::PromptCatalog;
use crate::mcp::protocol::{
    ErrorCode, JsonRpcErrorData, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::service::{ServiceRegistry, ToolDefinition};

/// URI under which the instructions are exposed as a resource.
pub const INSTRUCTIONS_URI: &str = "mcp://instructions";

/// Protocol version reported by `server/info`.
const SERVER_INFO_PROTOCOL_VERSION: &str = "2.0";

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ListCapability,
    /// Resource-related capabilities.
    pub resources: ResourceCapabilities,
    /// Prompt-related capabilities.
    pub prompts: ListCapability,
}

/// Capability with a change-notification flag.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ListCapability {
    /// Whether the list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Resource capabilities.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ResourceCapabilities {
    /// Whether clients may subscribe to resource updates.
    pub subscribe: bool,
    /// Whether the resource list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Routes decoded requests to protocol handlers or registered services.
#[derive(Debug)]
pub struct RequestRouter {
    registry: Arc<ServiceRegistry>,
    info: ServerInfo,
    description: String,
    instructions: String,
    prompts: PromptCatalog,
}

impl RequestRouter {
    /// Creates a router over `registry` with the given operator instructions.
    #[must_use]
    pub fn new(registry: Arc<ServiceRegistry>, instructions: impl Into<String>) -> Self {
        Self {
            registry,
            info: ServerInfo::default(),
            description: "MCP server for the host application".to_string(),
            instructions: instructions.into(),
            prompts: PromptCatalog::new(),
        }
    }

    /// Overrides the server name and version reported to clients.
    #[must_use]
    pub fn with_server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.info = ServerInfo {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    /// Sets the description reported by `server/info`.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the prompt catalog served by `prompts/get`.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptCatalog) -> Self {
        self.prompts = prompts;
        self
    }

    /// Server identity reported to clients.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.info
    }

    /// Operator instructions.
    #[must_use]
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The service registry.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Routes a request and produces exactly one response.
    ///
    /// Must run on the host's main thread: service handlers are invoked
    /// directly from here.
    #[must_use]
    pub fn route(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!(method = %req.method, id = ?req.id, "Routing request");

        if req.jsonrpc != JSONRPC_VERSION {
            return JsonRpcResponse::invalid_request(req.id.clone(), "jsonrpc must be \"2.0\"");
        }

        match req.method.as_str() {
            "initialize" => return self.handle_initialize(req),
            "tools/list" => return self.handle_tools_list(req),
            "tools/call" => return self.handle_tools_call(req),
            "server/info" | "serverInfo" => return self.handle_server_info(req),
            _ => {}
        }

        if is_instructions_probe(&req.method) {
            tracing::debug!(method = %req.method, "Matched instructions probe");
            return JsonRpcResponse::success(
                req.id.clone(),
                json!({ "instructions": self.instructions }),
            );
        }

        match req.method.as_str() {
            "resources/list" => JsonRpcResponse::success(req.id.clone(), json!({ "resources": [] })),
            "resources/read" => self.handle_resources_read(req),
            "prompts/list" => JsonRpcResponse::success(req.id.clone(), json!({ "prompts": [] })),
            "prompts/get" => self.handle_prompts_get(req),
            method if is_notification_method(method) => {
                JsonRpcResponse::success(req.id.clone(), json!({}))
            }
            "ping" => JsonRpcResponse::success(req.id.clone(), json!({})),
            _ => self.dispatch(req),
        }
    }

    /// Forwards `prefix/method` to the registered service.
    fn dispatch(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let Some((prefix, method)) = req.method.split_once('/') else {
            return JsonRpcResponse::error(
                req.id.clone(),
                JsonRpcErrorData::with_message(
                    ErrorCode::MethodNotFound,
                    "Method not found: Invalid method format (expected 'service/method')",
                ),
            );
        };

        match self.registry.get(prefix) {
            Some(service) => {
                tracing::debug!(service = prefix, method, "Dispatching to service");
                let mut response = service.handle(req, method);
                if response.id != req.id {
                    tracing::warn!(service = prefix, method, "Service answered with a foreign id");
                    response.id = req.id.clone();
                }
                response
            }
            None => unregistered_service(req, prefix, method),
        }
    }

    fn handle_initialize(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        if let Some(client) = req.params.get("clientInfo").and_then(|c| c.get("name")) {
            tracing::info!(client = %client, "Client initialising");
        }

        JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": ServerCapabilities::default(),
                "serverInfo": self.info,
                "instructions": self.instructions,
            }),
        )
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<ToolDefinition> = self
            .registry
            .iter()
            .flat_map(|(prefix, service)| {
                service.tools().into_iter().filter_map(move |tool| {
                    if tool.name.contains('/') {
                        tracing::warn!(service = prefix, tool = %tool.name, "Skipping tool with '/' in its name");
                        None
                    } else {
                        Some(tool.to_definition(prefix))
                    }
                })
            })
            .collect();

        tracing::debug!(count = tools.len(), "Returning tools");
        JsonRpcResponse::success(req.id.clone(), json!({ "tools": tools }))
    }

    fn handle_tools_call(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let Some((prefix, method)) = req
            .str_param("name")
            .and_then(|name| name.split_once('/'))
        else {
            return JsonRpcResponse::invalid_params(req.id.clone(), "Invalid tool name format");
        };

        let arguments = match req.params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(args)) => args.clone(),
            Some(_) => {
                return JsonRpcResponse::invalid_params(
                    req.id.clone(),
                    "'arguments' must be an object",
                )
            }
        };

        let Some(service) = self.registry.get(prefix) else {
            return unregistered_service(req, prefix, method);
        };

        let inner = req.redirect(format!("{prefix}/{method}"), arguments);
        tracing::debug!(service = prefix, method, "Calling tool");
        shape_tool_response(req.id.clone(), service.handle(&inner, method), prefix, method)
    }

    fn handle_server_info(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let services: Vec<Value> = self
            .registry
            .iter()
            .map(|(prefix, service)| json!({ "prefix": prefix, "description": service.describe() }))
            .collect();

        JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "name": self.info.name,
                "version": self.info.version,
                "protocol_version": SERVER_INFO_PROTOCOL_VERSION,
                "description": self.description,
                "instructions": self.instructions,
                "services": services,
            }),
        )
    }

    fn handle_resources_read(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let uri = req.str_param("uri").unwrap_or_default();

        let contents = if uri == INSTRUCTIONS_URI || is_instructions_probe(uri) {
            vec![json!({
                "uri": uri,
                "mimeType": "text/plain",
                "text": self.instructions,
            })]
        } else {
            Vec::new()
        };

        JsonRpcResponse::success(req.id.clone(), json!({ "contents": contents }))
    }

    fn handle_prompts_get(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let name = req.str_param("name").unwrap_or_default();
        let arguments = req
            .params
            .get("arguments")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let Some(prompt) = self.prompts.render(name, &arguments) else {
            return JsonRpcResponse::error(
                req.id.clone(),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidParams,
                    format!("Unknown prompt: {name}"),
                ),
            );
        };

        match serde_json::to_value(prompt) {
            Ok(value) => JsonRpcResponse::success(req.id.clone(), value),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise prompt");
                JsonRpcResponse::internal_error(req.id.clone(), "failed to serialise prompt")
            }
        }
    }
}

/// Returns `true` for methods treated as requests for the instructions text.
///
/// Matches any name containing "instruction", ignoring case.
#[must_use]
pub fn is_instructions_probe(method: &str) -> bool {
    method.to_ascii_lowercase().contains("instruction")
}

fn is_notification_method(method: &str) -> bool {
    method == "initialized" || method.starts_with("notifications/")
}

fn unregistered_service(req: &JsonRpcRequest, prefix: &str, method: &str) -> JsonRpcResponse {
    tracing::debug!(service = prefix, method, "Service not registered");
    JsonRpcResponse::error(
        req.id.clone(),
        JsonRpcErrorData::with_message(
            ErrorCode::MethodNotFound,
            format!("Method not found: Service '{prefix}' is not registered"),
        )
        .with_data(json!({ "service": prefix, "method": method })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::prompts::PromptTemplate;
    use crate::mcp::protocol::{parse_request, RequestId};
    use crate::mcp::service::{McpService, ToolDescriptor};

    struct Alpha;

    impl McpService for Alpha {
        fn handle(&self, request: &JsonRpcRequest, method: &str) -> JsonRpcResponse {
            match method {
                "ping" => JsonRpcResponse::success(request.id.clone(), json!({ "pong": true })),
                _ => JsonRpcResponse::method_not_found(request.id.clone(), "alpha", method),
            }
        }

        fn describe(&self) -> String {
            "Alpha service".to_string()
        }

        fn tools(&self) -> Vec<ToolDescriptor> {
            vec![
                ToolDescriptor::new("ping", "Liveness"),
                ToolDescriptor::new("bad/name", "Never listed"),
            ]
        }
    }

    fn router() -> RequestRouter {
        let mut registry = ServiceRegistry::new();
        registry.register("alpha", Arc::new(Alpha)).unwrap();
        RequestRouter::new(Arc::new(registry), "Use alpha/ping.").with_prompts(
            PromptCatalog::new()
                .with_prompt(PromptTemplate::new("find", "Find {term}.").with_argument("term")),
        )
    }

    fn route(json: &str) -> JsonRpcResponse {
        router().route(&parse_request(json).unwrap())
    }

    fn error_code(response: &JsonRpcResponse) -> i32 {
        response.error_data().unwrap().code
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let response = route(r#"{"jsonrpc":"1.0","id":1,"method":"initialize"}"#);
        assert_eq!(error_code(&response), -32600);
        assert_eq!(response.id, Some(RequestId::Number(1)));
    }

    #[test]
    fn missing_version_is_invalid_request() {
        let response = route(r#"{"id":1,"method":"ping"}"#);
        assert_eq!(error_code(&response), -32600);
    }

    #[test]
    fn initialize_advertises_capabilities() {
        let response = route(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#);
        let result = response.result().unwrap();

        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(result["instructions"], "Use alpha/ping.");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
        assert_eq!(result["capabilities"]["resources"]["subscribe"], false);
        assert_eq!(result["capabilities"]["resources"]["listChanged"], false);
        assert_eq!(result["capabilities"]["prompts"]["listChanged"], false);
    }

    #[test]
    fn tools_list_skips_names_with_slash() {
        let response = route(r#"{"jsonrpc":"2.0","id":"t","method":"tools/list"}"#);
        let tools = response.result().unwrap()["tools"].as_array().unwrap().clone();

        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "alpha/ping");
    }

    #[test]
    fn tools_call_without_name_is_invalid_params() {
        let response = route(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{}}"#);
        assert_eq!(error_code(&response), -32602);
        assert_eq!(response.error_data().unwrap().message, "Invalid params: Invalid tool name format");
    }

    #[test]
    fn tools_call_without_slash_is_invalid_params() {
        let response =
            route(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"ping"}}"#);
        assert_eq!(error_code(&response), -32602);
    }

    #[test]
    fn tools_call_with_non_object_arguments_is_invalid_params() {
        let response = route(
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"alpha/ping","arguments":[1]}}"#,
        );
        assert_eq!(error_code(&response), -32602);
    }

    #[test]
    fn tools_call_unknown_service_is_method_not_found() {
        let response = route(
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nope/x"}}"#,
        );
        assert_eq!(error_code(&response), -32601);
        assert_eq!(response.error_data().unwrap().data, Some(json!({"service": "nope", "method": "x"})));
    }

    #[test]
    fn tools_call_failure_is_in_band() {
        let response = route(
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"alpha/missing"}}"#,
        );
        assert!(response.is_success());
        assert_eq!(response.result().unwrap()["isError"], true);
    }

    #[test]
    fn server_info_lists_services() {
        for method in ["server/info", "serverInfo"] {
            let request = JsonRpcRequest::new(Some(RequestId::Number(1)), method, Map::new());
            let response = router().route(&request);
            let result = response.result().unwrap();
            assert_eq!(result["protocol_version"], "2.0");
            assert_eq!(result["services"][0]["prefix"], "alpha");
            assert_eq!(result["services"][0]["description"], "Alpha service");
            assert_eq!(result["instructions"], "Use alpha/ping.");
        }
    }

    #[test]
    fn instruction_probes_match_case_insensitively() {
        for method in ["getInstructions", "server/INSTRUCTIONS", "instruction"] {
            let request = JsonRpcRequest::new(Some(RequestId::Number(1)), method, Map::new());
            let response = router().route(&request);
            assert_eq!(response.result().unwrap(), &json!({ "instructions": "Use alpha/ping." }));
        }
    }

    #[test]
    fn resources_list_is_empty() {
        let response = route(r#"{"jsonrpc":"2.0","id":1,"method":"resources/list"}"#);
        assert_eq!(response.result().unwrap(), &json!({ "resources": [] }));
    }

    #[test]
    fn resources_read_instructions() {
        let response = route(
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/read","params":{"uri":"mcp://instructions"}}"#,
        );
        let contents = &response.result().unwrap()["contents"];
        assert_eq!(contents[0]["uri"], INSTRUCTIONS_URI);
        assert_eq!(contents[0]["mimeType"], "text/plain");
        assert_eq!(contents[0]["text"], "Use alpha/ping.");
    }

    #[test]
    fn resources_read_other_uri_is_empty() {
        let response = route(
            r#"{"jsonrpc":"2.0","id":1,"method":"resources/read","params":{"uri":"file:///x"}}"#,
        );
        assert_eq!(response.result().unwrap(), &json!({ "contents": [] }));

        let response = route(r#"{"jsonrpc":"2.0","id":1,"method":"resources/read"}"#);
        assert!(response.is_success());
    }

    #[test]
    fn prompts_list_is_empty() {
        let response = route(r#"{"jsonrpc":"2.0","id":1,"method":"prompts/list"}"#);
        assert_eq!(response.result().unwrap(), &json!({ "prompts": [] }));
    }

    #[test]
    fn prompts_get_renders_template() {
        let response = route(
            r#"{"jsonrpc":"2.0","id":1,"method":"prompts/get","params":{"name":"find","arguments":{"term":"lamps"}}}"#,
        );
        let result = response.result().unwrap();
        assert_eq!(result["description"], "Prompt: find");
        assert_eq!(result["messages"][0]["role"], "user");
        assert_eq!(result["messages"][0]["content"], "Find lamps.");
    }

    #[test]
    fn prompts_get_unknown_is_invalid_params() {
        let response =
            route(r#"{"jsonrpc":"2.0","id":1,"method":"prompts/get","params":{"name":"nope"}}"#);
        assert_eq!(error_code(&response), -32602);
        assert_eq!(response.error_data().unwrap().message, "Unknown prompt: nope");
    }

    #[test]
    fn notifications_get_empty_result() {
        for method in ["notifications/initialized", "initialized", "notifications/cancelled"] {
            let response = router().route(&JsonRpcRequest::new(None, method, Map::new()));
            assert!(response.id.is_none());
            assert_eq!(response.result().unwrap(), &json!({}));
        }
    }

    #[test]
    fn ping_gets_empty_result() {
        let response = route(r#"{"jsonrpc":"2.0","id":0,"method":"ping"}"#);
        assert_eq!(response.id, Some(RequestId::Number(0)));
        assert_eq!(response.result().unwrap(), &json!({}));
    }

    #[test]
    fn method_without_slash_is_not_found() {
        let response = route(r#"{"jsonrpc":"2.0","id":1,"method":"whatever"}"#);
        assert_eq!(error_code(&response), -32601);
        assert!(response.error_data().unwrap().data.is_none());
    }

    #[test]
    fn unknown_service_reports_service_and_method() {
        let response = route(r#"{"jsonrpc":"2.0","id":9,"method":"nope/whatever"}"#);
        let error = response.error_data().unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(error.data.as_ref().unwrap()["service"], "nope");
        assert_eq!(error.data.as_ref().unwrap()["method"], "whatever");
    }

    #[test]
    fn direct_call_reaches_service_unshaped() {
        let response = route(r#"{"jsonrpc":"2.0","id":1,"method":"alpha/ping"}"#);
        assert_eq!(response.result().unwrap(), &json!({ "pong": true }));

        let response = route(r#"{"jsonrpc":"2.0","id":1,"method":"alpha/missing"}"#);
        assert_eq!(error_code(&response), -32601);
    }

    /// Answers every call without echoing the request id.
    struct Careless;

    impl McpService for Careless {
        fn handle(&self, _request: &JsonRpcRequest, _method: &str) -> JsonRpcResponse {
            JsonRpcResponse::success(Some(RequestId::from("stale")), json!({ "ok": true }))
        }

        fn describe(&self) -> String {
            "Careless service".to_string()
        }

        fn tools(&self) -> Vec<ToolDescriptor> {
            vec![ToolDescriptor::new("go", "Ignores the id")]
        }
    }

    #[test]
    fn response_id_follows_the_request_not_the_service() {
        let mut registry = ServiceRegistry::new();
        registry.register("careless", Arc::new(Careless)).unwrap();
        let router = RequestRouter::new(Arc::new(registry), "");

        let direct = router.route(
            &parse_request(r#"{"jsonrpc":"2.0","id":7,"method":"careless/go"}"#).unwrap(),
        );
        assert_eq!(direct.id, Some(RequestId::Number(7)));
        assert_eq!(direct.result().unwrap(), &json!({ "ok": true }));

        let call = router.route(
            &parse_request(
                r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"careless/go"}}"#,
            )
            .unwrap(),
        );
        assert_eq!(call.id, Some(RequestId::Number(8)));
        assert_eq!(call.result().unwrap()["isError"], false);

        let notification = router.route(
            &parse_request(r#"{"jsonrpc":"2.0","method":"careless/go"}"#).unwrap(),
        );
        assert_eq!(notification.id, None);
    }
}
