//! Ordered middleware execution.

use std::future::Future;

use crate::error::{HandlerError, HandlerResult};
use crate::handler::{boxed, BoxedHandler};
use crate::http::{RequestContext, ResponseContext};

/// How a chain run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every middleware ran and none finished the response.
    Continue,
    /// A middleware finished the response; nothing after it may run.
    ShortCircuited,
}

/// Middleware run for every request, in registration order.
#[derive(Default)]
pub struct MiddlewareChain {
    handlers: Vec<BoxedHandler>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. Insertion order is execution order.
    pub fn register<F, Fut>(&mut self, handler: F)
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handlers.push(boxed(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every middleware in order, each to completion before the next.
    ///
    /// Stops as soon as the response is finished. Errors are returned to
    /// the caller untouched; the chain has no failure boundary of its own.
    pub async fn run(
        &self,
        req: &RequestContext,
        res: &ResponseContext,
    ) -> Result<ChainOutcome, HandlerError> {
        for (index, handler) in self.handlers.iter().enumerate() {
            handler.call(req.clone(), res.clone()).await?;
            if res.is_finished() {
                tracing::debug!(
                    request_id = %req.id(),
                    middleware = index,
                    "Middleware finished the response"
                );
                return Ok(ChainOutcome::ShortCircuited);
            }
        }
        Ok(ChainOutcome::Continue)
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
