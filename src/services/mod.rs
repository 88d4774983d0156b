//! Services hosted by the demo binary.
//!
//! Real hosts register their own domain services; this module provides the
//! diagnostics service plus the instructions and prompt catalog that go with
//! it.

pub mod diagnostics;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::mcp::prompts::{PromptCatalog, PromptTemplate};
use crate::mcp::service::ServiceRegistry;

pub use diagnostics::{DiagnosticsService, DIAGNOSTICS_PREFIX};

/// Operator instructions served by `initialize`, `server/info` and the
/// instructions resource.
pub const DEMO_INSTRUCTIONS: &str = "This server runs inside a host application. \
    Every tool executes on the host's main thread, one call at a time. \
    WORKFLOW: 1) diagnostics/ping to confirm the host is responsive, \
    2) diagnostics/host_ticks to see whether the host loop is advancing, \
    3) act, 4) diagnostics/swatch to capture an image and verify. \
    Tool names are always 'service/method'.";

/// Registers the demo services.
///
/// # Errors
///
/// Fails if a prefix is already taken in `registry`.
pub fn register_demo_services(
    registry: &mut ServiceRegistry,
    ticks: Arc<AtomicU64>,
) -> Result<(), RegistryError> {
    registry.register(DIAGNOSTICS_PREFIX, Arc::new(DiagnosticsService::new(ticks)))
}

/// Prompt catalog matching the demo services.
#[must_use]
pub fn demo_prompts() -> PromptCatalog {
    PromptCatalog::new()
        .with_prompt(PromptTemplate::new(
            "check_host",
            "Check the health of the host application:\n\
             1. Call diagnostics/ping and report the timestamp\n\
             2. Call diagnostics/host_ticks twice and confirm the tick count advances\n\
             3. Summarise whether the host loop looks healthy",
        ))
        .with_prompt(
            PromptTemplate::new(
                "echo_message",
                "Send '{message}' through diagnostics/echo as the 'msg' argument \
                 and confirm the reply matches exactly.",
            )
            .with_argument("message"),
        )
        .with_prompt(PromptTemplate::new(
            "capture_swatch",
            "Capture an image with diagnostics/swatch and describe its size and format.",
        ))
}
