//! Failure boundary around handler invocation.
//!
//! Converts both error returns and panics into a [`Failure`] so that one
//! misbehaving handler only ever affects its own request.

use std::any::Any;
use std::backtrace::Backtrace;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use thiserror::Error;

use crate::error::HandlerError;

/// Why a contained future did not complete successfully.
#[derive(Debug, Error)]
pub enum FailureKind {
    #[error("handler returned an error: {0}")]
    Error(#[from] HandlerError),

    #[error("handler panicked: {0}")]
    Panic(String),
}

/// A contained failure plus the stack at the boundary where it was caught.
#[derive(Debug)]
pub struct Failure {
    kind: FailureKind,
    backtrace: Backtrace,
}

impl Failure {
    fn new(kind: FailureKind) -> Self {
        // Failures are rare; always capture so the log carries a stack.
        Self {
            kind,
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Get what went wrong.
    pub fn kind(&self) -> &FailureKind {
        &self.kind
    }

    /// Stack captured when the failure reached the boundary.
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Whether the failure was a panic.
    pub fn is_panic(&self) -> bool {
        matches!(self.kind, FailureKind::Panic(_))
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Failure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

/// Await `future`, catching both its error and any panic raised while polling it.
pub async fn contain<T, F>(future: F) -> Result<T, Failure>
where
    F: Future<Output = Result<T, HandlerError>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(Failure::new(FailureKind::Error(err))),
        Err(payload) => Err(Failure::new(FailureKind::Panic(panic_message(payload.as_ref())))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
