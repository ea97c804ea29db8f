//! Application builder: the registration API and the entry points that
//! start serving.
//!
//! # Responsibilities
//! - Collect middleware in registration order
//! - Collect routes keyed by (method, exact path)
//! - Freeze both into a [`Dispatcher`] and serve it
//!
//! # Design Decisions
//! - Registration needs `&mut self`, serving consumes `self`: nothing can
//!   be registered once requests flow
//! - Paths are stored verbatim; no normalization

use std::future::Future;
use std::time::Duration;

use http::Method;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::error::{HandlerResult, ServerError};
use crate::http::middleware::MiddlewareChain;
use crate::http::{HttpServer, RequestContext, ResponseContext};
use crate::lifecycle::{spawn_signal_listener, Shutdown, ShutdownSignal};
use crate::net::Listener;
use crate::routing::RouteTable;

/// A mini web application.
#[derive(Debug, Default)]
pub struct App {
    config: ServerConfig,
    middleware: MiddlewareChain,
    routes: RouteTable,
}

impl App {
    /// Create an app with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an app that serves with `config`.
    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Append a middleware. It runs for every request, before routing.
    pub fn use_middleware<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.middleware.register(handler);
        self
    }

    /// Register a handler for `method` and the exact `path`.
    ///
    /// A later registration for the same key replaces the earlier one.
    pub fn add_route<F, Fut>(&mut self, method: Method, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.routes.add_route(method, path, handler);
        self
    }

    /// Register a `GET` handler for the exact `path`.
    pub fn get<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(Method::GET, path, handler)
    }

    /// Register a `POST` handler for the exact `path`.
    pub fn post<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(Method::POST, path, handler)
    }

    /// Register a `PUT` handler for the exact `path`.
    pub fn put<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(Method::PUT, path, handler)
    }

    /// Register a `DELETE` handler for the exact `path`.
    pub fn delete<F, Fut>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add_route(Method::DELETE, path, handler)
    }

    /// Freeze the registrations into a dispatcher.
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(self.middleware, self.routes, &self.config.limits)
    }

    /// Bind `port` on the configured host and serve until SIGINT or SIGTERM.
    pub async fn listen(mut self, port: u16) -> Result<(), ServerError> {
        self.config.listener.set_port(port);
        let listener = Listener::bind(&self.config.listener).await?;

        let shutdown = Shutdown::new();
        let signals = spawn_signal_listener(shutdown.clone());
        let result = self.serve(listener, shutdown.subscribe()).await;
        signals.abort();
        result
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn serve(self, listener: Listener, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let shutdown_timeout = Duration::from_secs(self.config.timeouts.shutdown_secs);
        HttpServer::new(self.into_dispatcher(), shutdown_timeout)
            .run(listener, shutdown)
            .await
    }
}
