//! MCP server lifecycle.
//!
//! [`McpServer`] owns the transport: a multi-threaded tokio runtime serving
//! the axum application from [`transport`](crate::mcp::transport). The host
//! keeps its own thread; `start` and `stop` are plain blocking calls meant to
//! be made from it, outside any async context.
//!
//! 1. **Start**: create the worker runtime, bind, spawn the accept loop
//! 2. **Serve**: workers parse frames and marshal routing onto the main thread
//! 3. **Stop**: signal graceful shutdown, then tear the runtime down

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

use crate::activity::{ActivityClock, ServerStatus};
use crate::config::Config;
use crate::dispatch::MainThreadDispatcher;
use crate::error::ServerError;
use crate::mcp::router::RequestRouter;
use crate::mcp::transport::{self, TransportState};

/// How long `stop` waits for in-flight requests before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct Running {
    runtime: Runtime,
    shutdown: oneshot::Sender<()>,
    addr: SocketAddr,
}

/// The in-process MCP server.
pub struct McpServer {
    router: Arc<RequestRouter>,
    dispatcher: MainThreadDispatcher,
    activity: Arc<ActivityClock>,
    serving: Arc<AtomicBool>,
    bind_ip: IpAddr,
    port: u16,
    advertised_host: String,
    running: Option<Running>,
}

impl McpServer {
    /// Creates a stopped server.
    ///
    /// `dispatcher` must belong to the host's main thread: every routed
    /// request runs through it.
    #[must_use]
    pub fn new(config: &Config, router: RequestRouter, dispatcher: MainThreadDispatcher) -> Self {
        Self {
            router: Arc::new(router),
            dispatcher,
            activity: Arc::new(ActivityClock::new()),
            serving: Arc::new(AtomicBool::new(false)),
            bind_ip: config.bind_ip(),
            port: config.server_port,
            advertised_host: config.advertised_host.clone(),
            running: None,
        }
    }

    /// Starts listening and returns the bound address.
    ///
    /// Must not be called from inside an async runtime.
    ///
    /// # Errors
    ///
    /// - [`ServerError::AlreadyRunning`] if the server is already started
    /// - [`ServerError::Runtime`] if the worker runtime cannot be created
    /// - [`ServerError::Bind`] if the port cannot be bound
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        if self.running.is_some() {
            tracing::warn!(port = self.port(), "MCP server already running");
            return Err(ServerError::AlreadyRunning);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("mcp-transport")
            .build()
            .map_err(ServerError::Runtime)?;

        let addr = SocketAddr::new(self.bind_ip, self.port);
        let listener = runtime
            .block_on(TcpListener::bind(addr))
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let app = transport::app(TransportState {
            router: Arc::clone(&self.router),
            dispatcher: self.dispatcher.clone(),
            activity: Arc::clone(&self.activity),
            advertised_host: self.advertised_host.clone(),
            port: local_addr.port(),
            running: Arc::clone(&self.serving),
        });

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let serving = Arc::clone(&self.serving);
        serving.store(true, Ordering::SeqCst);

        runtime.spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "MCP server terminated with an error");
            }
            serving.store(false, Ordering::SeqCst);
        });

        tracing::info!(address = %local_addr, "MCP server listening");
        tracing::info!("  POST http://{local_addr}/mcp      - streamable HTTP");
        tracing::info!("  GET  http://{local_addr}/sse      - SSE handshake");
        tracing::info!("  POST http://{local_addr}/message  - SSE messages");
        tracing::info!("  GET  http://{local_addr}/health   - health check");

        self.running = Some(Running {
            runtime,
            shutdown: shutdown_tx,
            addr: local_addr,
        });
        Ok(local_addr)
    }

    /// Stops the server. Does nothing if it is not running.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        // The accept loop may already be gone, in which case nobody listens.
        let _ = running.shutdown.send(());
        running.runtime.shutdown_timeout(SHUTDOWN_GRACE);
        self.serving.store(false, Ordering::SeqCst);

        tracing::info!(address = %running.addr, "MCP server stopped");
    }

    /// Returns `true` while the server is accepting connections.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.is_some() && self.serving.load(Ordering::SeqCst)
    }

    /// The bound address, while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// The bound port while running, otherwise the configured one.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.local_addr().map_or(self.port, |addr| addr.port())
    }

    /// Estimated number of connected clients (0 or 1).
    #[must_use]
    pub fn connected_clients(&self) -> u32 {
        if self.is_running() {
            self.activity.connected_clients()
        } else {
            0
        }
    }

    /// Coarse status for status indicators.
    #[must_use]
    pub fn status(&self) -> ServerStatus {
        ServerStatus::probe(self.is_running(), &self.activity)
    }

    /// The activity clock fed by the transport.
    #[must_use]
    pub const fn activity(&self) -> &Arc<ActivityClock> {
        &self.activity
    }

    /// The request router.
    #[must_use]
    pub const fn router(&self) -> &Arc<RequestRouter> {
        &self.router
    }
}

impl Drop for McpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("bind_ip", &self.bind_ip)
            .field("port", &self.port())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
