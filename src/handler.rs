//! Handler abstraction shared by middleware and routes.
//!
//! A handler is any `Fn(RequestContext, ResponseContext) -> impl Future`
//! whose output is a [`HandlerResult`]. Both contexts are cheap handles,
//! so the returned future owns everything it touches.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::HandlerResult;
use crate::http::{RequestContext, ResponseContext};

/// Object-safe form of a handler, as stored by the middleware chain and
/// the route table.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: RequestContext, res: ResponseContext) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: RequestContext, res: ResponseContext) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(req, res))
    }
}

/// Shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Erase a handler function into a [`BoxedHandler`].
///
/// Registration APIs take the function bound directly so that closure
/// argument types are inferred at the call site.
pub fn boxed<F, Fut>(handler: F) -> BoxedHandler
where
    F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(handler)
}
