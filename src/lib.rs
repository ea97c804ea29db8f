//! Mini Express: a minimal HTTP request-dispatch engine.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                     MINI EXPRESS                     │
//!                  │                                                      │
//!  Client Request  │  ┌─────────┐   ┌─────────┐   ┌────────────────────┐  │
//!  ────────────────┼─▶│   net   │──▶│  http   │──▶│     dispatch       │  │
//!                  │  │listener │   │ server  │   │ (failure boundary) │  │
//!                  │  └─────────┘   └─────────┘   └─────────┬──────────┘  │
//!                  │                                        │             │
//!                  │                    ┌───────────────────┴──────┐      │
//!                  │                    ▼                          ▼      │
//!                  │            ┌──────────────┐          ┌────────────┐  │
//!                  │            │  middleware  │─────────▶│  routing   │  │
//!                  │            │    chain     │          │ route table│  │
//!                  │            └──────────────┘          └─────┬──────┘  │
//!                  │                                            ▼         │
//!  Client Response │  ┌─────────────────┐               ┌────────────┐   │
//!  ◀───────────────┼──│ ResponseContext │◀──────────────│  handler   │   │
//!                  │  └─────────────────┘               └────────────┘   │
//!                  │                                                      │
//!                  │  Cross-cutting: config, observability, lifecycle     │
//!                  └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mini_express::{App, ResponseContext};
//!
//! # async fn run() -> Result<(), mini_express::ServerError> {
//! let mut app = App::new();
//! app.get("/", |_req, res: ResponseContext| async move {
//!     res.send("hello");
//!     Ok(())
//! });
//! app.listen(3000).await
//! # }
//! ```

// Core pipeline
pub mod app;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod routing;

// Transport
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub mod demo;

pub use app::App;
pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use error::{HandlerError, HandlerResult, ServerError};
pub use http::{Params, RequestContext, ResponseContext};
pub use lifecycle::Shutdown;
