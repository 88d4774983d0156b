//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP specification for exposing a host
//! application's services as tools to AI assistants. The server communicates
//! over HTTP (streamable and legacy SSE transports) using JSON-RPC 2.0
//! messages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │   │  Transport  │───▶│  Dispatch   │───▶│   Router    │      │
//! │   │ (HTTP/SSE)  │    │ (main thr.) │    │ (protocol)  │      │
//! │   └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                                │             │
//! │                                                ▼             │
//! │                      ┌─────────────┐    ┌─────────────┐      │
//! │                      │   Content   │◀───│  Services   │      │
//! │                      │  (shaping)  │    │ (registry)  │      │
//! │                      └─────────────┘    └─────────────┘      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod content;
pub mod prompts;
pub mod protocol;
pub mod router;
pub mod server;
pub mod service;
pub mod transport;

pub use protocol::{JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION};
pub use router::RequestRouter;
pub use server::McpServer;
pub use service::{McpService, ServiceRegistry, ToolDescriptor};
