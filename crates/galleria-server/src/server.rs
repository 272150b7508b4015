//! HTTP server lifecycle.
//!
//! [`Server`] owns the listening socket for one [`App`]:
//!
//! - [`start`](Server::start) binds, spawns the accept loop and returns
//!   once listening,
//! - [`stop`](Server::stop) stops accepting, marks the app as draining so
//!   `/readyz` fails, asks every connection to finish its in-flight request
//!   and waits up to the shutdown timeout,
//! - [`run_until`](Server::run_until) does both around a signal future.
//!
//! Each connection is served by hyper's HTTP/1.1 connection driver on its
//! own task.
//!
//! # Example
//!
//! ```rust,no_run
//! use galleria_server::{os_signal, App, Server, ServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let app = App::builder().title("Galleria").build()?;
//! let server = Server::new(ServerConfig::builder().http_addr("0.0.0.0:8080").build(), app);
//! server.run_until(os_signal()).await?;
//! # Ok(())
//! # }
//! ```

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use galleria_core::ApiError;
use galleria_middleware::Response;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::app::App;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

struct Running {
    local_addr: SocketAddr,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
    accept_loop: JoinHandle<()>,
}

/// Serves an [`App`] over HTTP/1.1.
pub struct Server {
    config: ServerConfig,
    app: App,
    running: Mutex<Option<Running>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Creates a stopped server.
    pub fn new(config: ServerConfig, app: App) -> Self {
        Self {
            config,
            app,
            running: Mutex::new(None),
        }
    }

    /// Returns the application.
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Returns the bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.local_addr)
    }

    /// Binds the socket and starts accepting connections.
    pub async fn start(&self) -> Result<SocketAddr, ServerError> {
        if let Some(addr) = self.local_addr() {
            return Err(ServerError::AlreadyStarted(addr));
        }

        let listener = TcpListener::bind(self.config.http_addr())
            .await
            .map_err(|source| ServerError::BindError {
                addr: self.config.http_addr().to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;

        let mut running = self.running.lock();
        if let Some(existing) = running.as_ref() {
            return Err(ServerError::AlreadyStarted(existing.local_addr));
        }

        let shutdown = ShutdownSignal::new();
        let tracker = ConnectionTracker::new();
        self.app.health().set_draining(false);

        let accept_loop = tokio::spawn(accept_loop(
            listener,
            self.app.clone(),
            self.config.keep_alive(),
            shutdown.clone(),
            tracker.clone(),
        ));

        *running = Some(Running {
            local_addr,
            shutdown,
            tracker,
            accept_loop,
        });
        drop(running);

        tracing::info!(addr = %local_addr, "server listening");
        Ok(local_addr)
    }

    /// Stops the server gracefully. Does nothing if it is not running.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let Some(running) = self.running.lock().take() else {
            return Ok(());
        };

        tracing::info!(addr = %running.local_addr, "stopping server");
        self.app.health().set_draining(true);
        running.shutdown.trigger();

        if let Err(err) = running.accept_loop.await {
            tracing::error!(error = %err, "accept loop terminated abnormally");
        }

        let timeout = self.config.shutdown_timeout();
        tracing::info!(
            active = running.tracker.active_connections(),
            timeout_ms = timeout.as_millis(),
            "draining connections"
        );

        if tokio::time::timeout(timeout, running.tracker.drained()).await.is_err() {
            tracing::warn!(
                active = running.tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }

    /// Starts, waits for `signal`, then stops.
    pub async fn run_until<F>(&self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        signal.await;
        self.stop().await
    }
}

async fn accept_loop(
    listener: TcpListener,
    app: App,
    keep_alive: bool,
    shutdown: ShutdownSignal,
    tracker: ConnectionTracker,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, remote_addr)) => {
                    let token = tracker.acquire();
                    let app = app.clone();
                    let shutdown = shutdown.clone();

                    tokio::spawn(async move {
                        if let Err(err) = serve_connection(stream, app, keep_alive, shutdown).await {
                            tracing::debug!(remote = %remote_addr, error = %err, "connection error");
                        }
                        drop(token);
                    });
                }
                Err(err) => tracing::error!(error = %err, "failed to accept connection"),
            },
            () = shutdown.recv() => break,
        }
    }
}

async fn serve_connection(
    stream: TcpStream,
    app: App,
    keep_alive: bool,
    shutdown: ShutdownSignal,
) -> Result<(), hyper::Error> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |request: http::Request<Incoming>| {
        let app = app.clone();
        async move { Ok::<_, Infallible>(serve_request(&app, request).await) }
    });

    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(io, service);
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.recv() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    }
}

async fn serve_request(app: &App, request: http::Request<Incoming>) -> Response {
    let (parts, body) = request.into_parts();
    match body.collect().await {
        Ok(collected) => app.dispatch(parts, collected.to_bytes()).await,
        Err(err) => {
            tracing::debug!(error = %err, "failed to read request body");
            app.error_response(&ApiError::bad_request("Failed to read request body"))
        }
    }
}
