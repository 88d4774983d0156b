//! host-bridge-mcp: in-process MCP server for single-threaded host applications
//!
//! This library exposes a host application's capabilities to AI agents over
//! the Model Context Protocol (JSON-RPC 2.0 on HTTP and SSE), while keeping
//! every touch of host state on the host's main thread.
//!
//! # Architecture
//!
//! - **Transport**: axum front-end on its own worker pool (`/mcp`, `/sse`,
//!   `/message`, `/health`)
//! - **Dispatch**: closures marshalled onto the host's main thread and
//!   awaited through one-shot completion signals
//! - **Routing**: protocol methods answered in place, `service/method` calls
//!   forwarded to registered services
//!
//! Services are opaque handlers behind [`mcp::service::McpService`]; the
//! host registers them once at startup.
//!
//! # Modules
//!
//! - [`activity`]: Last-request clock and server status
//! - [`config`]: Configuration loading and validation
//! - [`dispatch`]: Main-thread dispatcher
//! - [`error`]: Error types
//! - [`mcp`]: MCP protocol implementation
//! - [`services`]: Demo services hosted by the binary

pub mod activity;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod services;
