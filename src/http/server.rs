//! HTTP server: the accept loop in front of the dispatcher.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Serve each connection with hyper's HTTP/1.1 implementation
//! - Hand every request to the [`Dispatcher`]
//! - Stop accepting on shutdown and drain open connections
//!
//! # Design Decisions
//! - One task per connection; requests on a connection are sequential
//! - The dispatcher never fails, so the hyper service is infallible
//! - On shutdown each connection finishes its in-flight request and closes

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use http::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::dispatch::Dispatcher;
use crate::error::ServerError;
use crate::lifecycle::ShutdownSignal;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener, ListenerError};

// Back-off after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// HTTP server bound to a frozen dispatcher.
#[derive(Debug)]
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
    shutdown_timeout: Duration,
    connections: ConnectionTracker,
}

impl HttpServer {
    /// Create a server; `shutdown_timeout` bounds the drain.
    pub fn new(dispatcher: Dispatcher, shutdown_timeout: Duration) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            shutdown_timeout,
            connections: ConnectionTracker::new(),
        }
    }

    /// Get the dispatcher every connection shares.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run the server until `shutdown` fires, then drain connections.
    pub async fn run(self, listener: Listener, mut shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            routes = self.dispatcher.routes().len(),
            middleware = self.dispatcher.middleware().len(),
            "HTTP server starting"
        );
        tracing::info!("Server is listening on port {}", addr.port());

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        self.spawn_connection(stream, peer, permit, shutdown.clone());
                    }
                    Err(ListenerError::Accept(e)) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                    Err(e) => return Err(e.into()),
                },
            }
        }

        // Stop accepting before draining.
        drop(listener);

        let open = self.connections.open_connections();
        tracing::info!(open_connections = open, "Shutting down, draining connections");
        if !self.connections.drain(self.shutdown_timeout).await {
            tracing::warn!(
                open_connections = self.connections.open_connections(),
                timeout_secs = self.shutdown_timeout.as_secs(),
                "Drain timed out, abandoning open connections"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: std::net::SocketAddr,
        permit: ConnectionPermit,
        mut shutdown: ShutdownSignal,
    ) {
        let dispatcher = Arc::clone(&self.dispatcher);
        let guard = self.connections.track();

        tokio::spawn(async move {
            let connection_id = guard.id();
            let service = service_fn(move |request: Request<Incoming>| {
                let dispatcher = Arc::clone(&dispatcher);
                async move { Ok::<_, Infallible>(dispatcher.handle(request).await) }
            });

            let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown.recv() => {
                    conn.as_mut().graceful_shutdown();
                    conn.as_mut().await
                }
            };

            if let Err(e) = result {
                tracing::debug!(
                    connection_id = %connection_id,
                    peer_addr = %peer,
                    error = %e,
                    "Connection closed with error"
                );
            }

            drop(guard);
            drop(permit);
        });
    }
}
