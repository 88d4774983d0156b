//! Service interface and registry.
//!
//! A *service* groups related tools under a prefix (`assets`, `viewport`, …).
//! The router splits `prefix/method` names and hands the tail to the service
//! registered under the prefix. Services describe their own tools, which the
//! router aggregates for `tools/list`.
//!
//! Services are only ever invoked on the host's main thread (the transport
//! marshals every routed call through the dispatcher), so a service may touch
//! host state freely from `handle`.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::RegistryError;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};

/// The contract every domain handler implements.
pub trait McpService: Send + Sync {
    /// Handles `method` (the part after `prefix/`) for this service.
    ///
    /// Business-level failures are returned as JSON-RPC error responses; for
    /// `tools/call` invocations the router re-wraps them as in-band errors.
    fn handle(&self, request: &JsonRpcRequest, method: &str) -> JsonRpcResponse;

    /// Human-readable description of the service.
    fn describe(&self) -> String;

    /// Tools this service exposes, named without the service prefix.
    fn tools(&self) -> Vec<ToolDescriptor>;
}

/// Describes a single tool (method) of a service.
///
/// Produced on demand when `tools/list` is called.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Method name (without service prefix).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON schema of each parameter, keyed by parameter name.
    pub properties: Map<String, Value>,
    /// Names of required parameters.
    pub required: Vec<String>,
}

impl ToolDescriptor {
    /// Creates a tool with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    /// Adds an optional parameter of the given JSON type.
    #[must_use]
    pub fn param(mut self, name: &str, kind: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": kind, "description": description }),
        );
        self
    }

    /// Adds a required parameter of the given JSON type.
    #[must_use]
    pub fn required_param(mut self, name: &str, kind: &str, description: &str) -> Self {
        self = self.param(name, kind, description);
        self.required.push(name.to_string());
        self
    }

    /// Converts the descriptor into its `tools/list` wire form under `prefix`.
    #[must_use]
    pub fn to_definition(&self, prefix: &str) -> ToolDefinition {
        ToolDefinition {
            name: format!("{prefix}/{}", self.name),
            description: self.description.clone(),
            input_schema: InputSchema {
                kind: "object",
                properties: self.properties.clone(),
                required: self.required.clone(),
            },
        }
    }
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Namespaced tool name (`prefix/name`).
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: InputSchema,
}

/// JSON Schema object describing tool input.
#[derive(Debug, Clone, Serialize)]
pub struct InputSchema {
    /// Always "object".
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Parameter schemas.
    pub properties: Map<String, Value>,
    /// Required parameter names; omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Prefix-keyed store of services.
///
/// Populated once at startup and read-only afterwards, so it can be shared
/// across threads behind an `Arc` without locking. Iteration follows
/// registration order.
#[derive(Default)]
pub struct ServiceRegistry {
    services: IndexMap<String, Arc<dyn McpService>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under `prefix`.
    ///
    /// # Errors
    ///
    /// Fails if the prefix is empty, contains `/`, or is already registered.
    pub fn register(
        &mut self,
        prefix: impl Into<String>,
        service: Arc<dyn McpService>,
    ) -> Result<(), RegistryError> {
        let prefix = prefix.into();

        if prefix.is_empty() {
            return Err(RegistryError::EmptyPrefix);
        }
        if prefix.contains('/') {
            return Err(RegistryError::InvalidPrefix { prefix });
        }
        if self.services.contains_key(&prefix) {
            return Err(RegistryError::DuplicatePrefix { prefix });
        }

        tracing::debug!(prefix = %prefix, "Registered service");
        self.services.insert(prefix, service);
        Ok(())
    }

    /// Looks up the service registered under `prefix`.
    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&Arc<dyn McpService>> {
        self.services.get(prefix)
    }

    /// Iterates over `(prefix, service)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn McpService>)> {
        self.services.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("prefixes", &self.services.keys().collect::<Vec<_>>())
            .finish()
    }
}
