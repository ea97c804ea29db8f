//! Shared utilities for integration and load testing.

use std::net::SocketAddr;

use mini_express::config::ListenerConfig;
use mini_express::net::Listener;
use mini_express::{App, ServerError, Shutdown};
use tokio::task::JoinHandle;

/// An app served on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger shutdown and wait for the server to stop.
    pub async fn stop(self) -> Result<(), ServerError> {
        self.shutdown.trigger();
        self.handle.await.expect("server task panicked")
    }
}

/// Bind 127.0.0.1:0 and serve `app` in the background.
pub async fn spawn_app(app: App) -> TestServer {
    let listener = Listener::bind(&ListenerConfig {
        bind_address: "127.0.0.1:0".into(),
        max_connections: 64,
    })
    .await
    .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let handle = tokio::spawn(app.serve(listener, signal));

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Client without connection pooling so every request opens a connection.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
