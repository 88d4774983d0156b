//! host-bridge-mcp: demo host running the in-process MCP server
//!
//! The binary plays the part of a single-threaded host application: its main
//! thread runs a fixed-rate frame loop that drains the main-thread queue,
//! while the MCP server answers clients from its own worker pool.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use host_bridge_mcp::activity::ServerStatus;
use host_bridge_mcp::config;
use host_bridge_mcp::dispatch::main_thread;
use host_bridge_mcp::mcp::router::RequestRouter;
use host_bridge_mcp::mcp::server::McpServer;
use host_bridge_mcp::mcp::service::ServiceRegistry;
use host_bridge_mcp::services::{demo_prompts, register_demo_services, DEMO_INSTRUCTIONS};

/// Host frame period (~60 Hz).
const FRAME: Duration = Duration::from_millis(16);

/// Demo host running the in-process MCP server.
///
/// Serves MCP over streamable HTTP and SSE, executing every tool call on
/// the host's main thread.
#[derive(Parser, Debug)]
#[command(name = "host-bridge-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,

    /// Override the configured server port
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Spawns a thread that raises `flag` on Ctrl+C.
fn watch_ctrl_c(flag: Arc<AtomicBool>) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!(error = %e, "Failed to listen for Ctrl+C");
                    return;
                }
                info!("Received Ctrl+C, initiating graceful shutdown");
                flag.store(true, Ordering::SeqCst);
            });
        })?;

    Ok(())
}

/// Entry point for the demo host.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let mut cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nConfig is read from: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };
    if let Some(port) = args.port {
        cfg.server_port = port;
    }

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "host-bridge-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!();

    if !cfg.server_enabled {
        info!("MCP server disabled in configuration");
        return ExitCode::SUCCESS;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.server_port,
        "Starting host-bridge-mcp"
    );

    // This thread is the host's main thread from here on.
    let (dispatcher, mut queue) = main_thread();
    let ticks = Arc::new(AtomicU64::new(0));

    let mut registry = ServiceRegistry::new();
    if let Err(e) = register_demo_services(&mut registry, Arc::clone(&ticks)) {
        error!(error = %e, "Failed to register services");
        return ExitCode::FAILURE;
    }
    info!(services = registry.len(), "Services registered");

    let router = RequestRouter::new(Arc::new(registry), DEMO_INSTRUCTIONS)
        .with_description("Demo host exposing diagnostics over MCP")
        .with_prompts(demo_prompts());

    let mut server = McpServer::new(&cfg, router, dispatcher);
    if let Err(e) = server.start() {
        error!(error = %e, "Failed to start MCP server");
        return ExitCode::FAILURE;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = watch_ctrl_c(Arc::clone(&shutdown)) {
        error!(error = %e, "Failed to install Ctrl+C handler");
        server.stop();
        return ExitCode::FAILURE;
    }

    // Host frame loop
    let mut status = server.status();
    info!(status = %status, "Host loop running");
    while !shutdown.load(Ordering::SeqCst) {
        queue.pump();
        ticks.fetch_add(1, Ordering::Relaxed);

        let current = server.status();
        if current != status {
            info!(from = %status, to = %current, "Server status changed");
            status = current;
        }
        if current == ServerStatus::Offline {
            warn!("MCP server stopped unexpectedly");
            break;
        }

        thread::sleep(FRAME);
    }

    // Fail pending requests fast instead of waiting out the grace period.
    queue.close();
    server.stop();

    info!(ticks = ticks.load(Ordering::Relaxed), "Host shut down gracefully");
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_from_flags() {
        assert_eq!(get_log_level(0, true, "trace"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(1, false, "error"), Level::INFO);
        assert_eq!(get_log_level(2, false, "error"), Level::DEBUG);
        assert_eq!(get_log_level(5, false, "error"), Level::TRACE);
    }

    #[test]
    fn port_override_rejects_zero() {
        use clap::CommandFactory;
        let result = Args::command().try_get_matches_from(["host-bridge-mcp", "--port", "0"]);
        assert!(result.is_err());
    }
}
