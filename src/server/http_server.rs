//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::parser::parse_request;
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

/// How long cancelled requests get to unwind before their tasks are aborted.
const CANCEL_GRACE: Duration = Duration::from_millis(500);

/// An HTTP server dispatching every request through a [`Router`].
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    router: Arc<Router>,
    shutdown: CancellationToken,
    active: AtomicUsize,
}

impl HttpServer {
    /// Create a server for the routes registered on `router`.
    ///
    /// Registration is over at this point: the router is shared read-only by
    /// every connection.
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
            shutdown: CancellationToken::new(),
            active: AtomicUsize::new(0),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// A token that stops the accept loop when cancelled, as Ctrl+C does.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of connection tasks that have not been joined yet.
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Log the registered endpoints.
    fn display_server_info(&self) {
        let routes = self.router.routes();
        info!("Registered endpoints ({count}):", count = routes.len());
        for (method, pattern) in routes {
            info!("  {method:<7} {pattern}");
        }
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = TcpListener::bind(&self.config.addr).await?;
        info!("Server listening on http://{addr}", addr = listener.local_addr()?);
        Ok(listener)
    }

    /// Set up a Ctrl+C handler for graceful shutdown.
    fn setup_ctrl_c_handler(shutdown_tx: mpsc::Sender<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    let _ = shutdown_tx.send(()).await;
                }
                Err(e) => {
                    error!("Error setting up Ctrl+C handler: {e}");
                }
            }
        })
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        router: Arc<Router>,
        read_buffer_size: usize,
        requests: &CancellationToken,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::text(
                    StatusCode::ServiceUnavailable,
                    "Server is at capacity, please try again later",
                );
                let _ = socket.write_all(&response.to_bytes()).await;
                return;
            }
        };

        let cancel = requests.child_token();
        tasks.spawn(async move {
            // Released when the connection task ends.
            let _permit = permit;

            if let Err(e) = Self::handle_connection(&mut socket, &router, read_buffer_size, cancel).await {
                error!("Error handling connection from {addr}: {e}");
            }
        });
    }

    /// Handle connection errors. Returns `true` when the accept loop should stop.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
        false
    }

    /// Perform graceful shutdown.
    ///
    /// In-flight requests get `shutdown_timeout` to finish. After that their
    /// base cancellation fires, which makes every timeout guard answer right
    /// away, and whatever still runs after a short grace period is aborted.
    async fn perform_shutdown(tasks: &mut JoinSet<()>, requests: &CancellationToken, shutdown_timeout: Duration) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        if drain(tasks, shutdown_timeout).await {
            info!("Server shutdown complete");
            return;
        }

        warn!("{len} connections still running after {shutdown_timeout:?}, cancelling them", len = tasks.len());
        requests.cancel();
        if !drain(tasks, CANCEL_GRACE).await {
            warn!("Aborting {len} connections", len = tasks.len());
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }

        info!("Server shutdown complete");
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn start(&self) -> Result<(), Error> {
        self.display_server_info();
        let listener = self.setup_listener().await?;
        self.serve(listener).await
    }

    /// Serve connections accepted on `listener` until Ctrl+C or
    /// [`shutdown_token`](Self::shutdown_token) is cancelled.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Error> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));
        let requests = CancellationToken::new();

        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let ctrl_c = Self::setup_ctrl_c_handler(shutdown_tx);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                Some(()) = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested, stopping server...");
                    break;
                }

                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("Connection task failed: {e}");
                    }
                    self.active.store(tasks.len(), Ordering::Relaxed);
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            debug!("Accepted connection from {addr}");
                            Self::handle_new_connection(
                                socket,
                                addr,
                                Arc::clone(&semaphore),
                                Arc::clone(&self.router),
                                self.config.read_buffer_size,
                                &requests,
                                &mut tasks,
                            ).await;
                            self.active.store(tasks.len(), Ordering::Relaxed);
                        }
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        ctrl_c.abort();
        Self::perform_shutdown(&mut tasks, &requests, self.config.shutdown_timeout).await;
        self.active.store(0, Ordering::Relaxed);

        Ok(())
    }

    /// Serve a single request read from `socket`.
    ///
    /// The request must arrive in one read of at most `read_buffer_size`
    /// bytes. A request that does not parse is answered with 400 and the
    /// parse error is returned. Otherwise the router's response is written;
    /// if a handler failed, its error is returned after the 500 went out.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        router: &Router,
        read_buffer_size: usize,
        cancel: CancellationToken,
    ) -> Result<(), Error> {
        let mut buf = vec![0; read_buffer_size];

        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        let request = match parse_request(&buf[..n]) {
            Ok(req) => req,
            Err(e) => {
                let response = HttpResponse::text(StatusCode::BadRequest, format!("Error parsing request: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(Error::ParseError(e));
            }
        };

        let outcome = router.dispatch(request, cancel).await;
        socket.write_all(&outcome.response.to_bytes()).await?;
        socket.flush().await?;

        match outcome.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Join tasks until none are left or `limit` passes. Returns whether all finished.
async fn drain(tasks: &mut JoinSet<()>, limit: Duration) -> bool {
    let joined = tokio::time::timeout(limit, async {
        while let Some(res) = tasks.join_next().await {
            if let Err(e) = res {
                error!("Task failed during shutdown: {e}");
            }
        }
    })
    .await;
    joined.is_ok()
}
