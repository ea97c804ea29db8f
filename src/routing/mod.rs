//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (before serving):
//!     add_route(method, path, handler)
//!     → router.rs (method → path → handler)
//!
//! Request time:
//!     (method, exact path)
//!     → router.rs (nested hash lookup)
//!     → Return: handler or None
//! ```
//!
//! # Design Decisions
//! - Exact matches only: no parameters, wildcards or prefixes
//! - Case-sensitive, no trailing-slash normalization
//! - Frozen once serving starts (shared read-only through Arc)
//! - Last registration for a key wins

pub mod router;

pub use router::RouteTable;
