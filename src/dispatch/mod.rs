//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! hyper::Request
//!     → dispatcher.rs (build contexts, run middleware, route, read body)
//!     → boundary.rs (contain handler errors and panics)
//!     → hyper::Response
//! ```

pub mod boundary;
pub mod dispatcher;

pub use boundary::{Failure, FailureKind};
pub use dispatcher::{Dispatched, Dispatcher, Outcome};
