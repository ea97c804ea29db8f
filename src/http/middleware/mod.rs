//! Middleware subsystem.
//!
//! # Data Flow
//! ```text
//! RequestContext + ResponseContext
//!     → chain.rs (each middleware in registration order)
//!     → stop early once the response is finished
//!     → otherwise hand back to the dispatcher for routing
//! ```
//!
//! # Design Decisions
//! - Middleware and route handlers share one handler type
//! - Strictly sequential: one middleware at a time per request
//! - The chain has no failure boundary; the dispatcher owns it

pub mod chain;
pub mod logger;

pub use chain::{ChainOutcome, MiddlewareChain};
pub use logger::log_request;
