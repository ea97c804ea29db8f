//! Error types shared across the dispatch pipeline.
//!
//! Handler failures never reach the client in detail: the dispatcher logs
//! them and answers with a generic 500. The variants here exist so that
//! handler code can use `?` on the usual fallible operations.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::net::listener::ListenerError;

/// Result type returned by every middleware and route handler.
pub type HandlerResult = Result<(), HandlerError>;

/// Failure raised by a middleware or route handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Free-form failure message.
    #[error("{0}")]
    Message(String),

    /// A value passed to `json()` could not be serialized.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O performed by the handler failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error the handler wants to bubble up.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Build a failure from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }
}

/// Errors that stop the server itself (as opposed to a single request).
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Binding or accepting on the listener failed.
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),

    /// Socket-level I/O failure outside a single request.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
