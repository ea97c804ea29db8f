//! Route lookup.
//!
//! # Responsibilities
//! - Store one handler per (method, path) key
//! - Resolve a request to its handler, or report no match
//!
//! # Design Decisions
//! - O(1) lookup via nested HashMap (no prefix tree needed for exact paths)
//! - Explicit `None` rather than a silent default handler

use std::collections::HashMap;
use std::future::Future;

use http::Method;

use crate::error::HandlerResult;
use crate::handler::{boxed, BoxedHandler};
use crate::http::{RequestContext, ResponseContext};

/// Two-level route table: method → path → handler.
#[derive(Default)]
pub struct RouteTable {
    routes: HashMap<Method, HashMap<String, BoxedHandler>>,
}

impl RouteTable {
    /// Create an empty route table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for the exact (method, path) key.
    ///
    /// An existing handler under the same key is replaced.
    pub fn add_route<F, Fut>(&mut self, method: Method, path: impl Into<String>, handler: F)
    where
        F: Fn(RequestContext, ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.insert(method, path.into(), boxed(handler));
    }

    pub(crate) fn insert(&mut self, method: Method, path: String, handler: BoxedHandler) {
        let by_path = self.routes.entry(method.clone()).or_default();
        if by_path.insert(path.clone(), handler).is_some() {
            tracing::debug!(method = %method, path = %path, "Route handler replaced");
        }
    }

    /// Handler registered for exactly this method and path.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<&BoxedHandler> {
        self.routes.get(method)?.get(path)
    }

    /// Whether a handler is registered for this key.
    pub fn contains(&self, method: &Method, path: &str) -> bool {
        self.resolve(method, path).is_some()
    }

    /// Number of registered (method, path) keys.
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    /// Whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .routes
            .iter()
            .flat_map(|(method, paths)| paths.keys().map(move |path| format!("{} {}", method, path)))
            .collect();
        keys.sort();
        f.debug_struct("RouteTable").field("routes", &keys).finish()
    }
}
