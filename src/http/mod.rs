//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper HTTP/1.1, one task per connection)
//!     → request.rs (request id, query and form body parsing)
//!     → middleware/ (ordered chain, may finish the response early)
//!     → [route table picks the handler]
//!     → response.rs (status, headers, terminal write)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{BodyError, Params, RequestContext};
pub use response::ResponseContext;
pub use server::HttpServer;
