//! Per-request orchestration.
//!
//! # State Machine
//! ```text
//! RECEIVED → MIDDLEWARE_RUNNING ─┬─ finished ──→ SHORT_CIRCUITED
//!                                └─ ROUTING ─┬─ no match ─→ NOT_FOUND (404)
//!                                            ├─ body rejected → REJECTED (413/400)
//!                                            └─ handler ──┬─ ok ──→ HANDLED
//!                                                         └─ fail ─→ ERRORED (500)
//! every path ends in SENT: the response context becomes a hyper response
//! ```
//!
//! # Design Decisions
//! - Middleware and route handlers share one failure boundary: an error or
//!   panic in either yields a generic 500
//! - The body is read only once a route matched, and always before the
//!   route handler starts
//! - No retries: every failure is final for that request only

use std::fmt;
use std::time::Instant;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Body;
use tracing::Instrument;

use crate::config::LimitsConfig;
use crate::dispatch::boundary::contain;
use crate::http::middleware::{ChainOutcome, MiddlewareChain};
use crate::http::request::{read_body, BodyError};
use crate::http::{RequestContext, ResponseContext};
use crate::observability::metrics;
use crate::routing::RouteTable;

/// Terminal state reached by one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A middleware finished the response.
    ShortCircuited,
    /// The matched route handler completed.
    Handled,
    /// No route for (method, path).
    NotFound,
    /// A middleware or the route handler failed.
    Errored,
    /// The request body was refused (too large or unreadable).
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::ShortCircuited => "short_circuited",
            Outcome::Handled => "handled",
            Outcome::NotFound => "not_found",
            Outcome::Errored => "errored",
            Outcome::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of dispatching one request.
#[derive(Debug)]
pub struct Dispatched {
    pub response: Response<Full<Bytes>>,
    pub outcome: Outcome,
}

/// Immutable request pipeline: middleware chain plus route table.
#[derive(Debug)]
pub struct Dispatcher {
    middleware: MiddlewareChain,
    routes: RouteTable,
    max_body_size: usize,
}

impl Dispatcher {
    /// Freeze a middleware chain and route table into a dispatcher.
    pub fn new(middleware: MiddlewareChain, routes: RouteTable, limits: &LimitsConfig) -> Self {
        Self {
            middleware,
            routes,
            max_body_size: limits.max_body_size,
        }
    }

    /// Get the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Get the middleware chain.
    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Dispatch a request and return only the response.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.dispatch(request).await.response
    }

    /// Run one request through the full pipeline.
    pub async fn dispatch<B>(&self, request: Request<B>) -> Dispatched
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let req = RequestContext::from_parts(&parts);
        let res = ResponseContext::new();

        let span = tracing::info_span!(
            "request",
            request_id = %req.id(),
            method = %req.method(),
            path = %req.path()
        );
        let outcome = self.drive(&req, &res, body).instrument(span).await;

        let response = res.take_response();
        let status = response.status();
        metrics::record_request(req.method().as_str(), status.as_u16(), outcome.as_str(), start);
        tracing::debug!(
            request_id = %req.id(),
            status = status.as_u16(),
            outcome = %outcome,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request dispatched"
        );

        Dispatched { response, outcome }
    }

    async fn drive<B>(&self, req: &RequestContext, res: &ResponseContext, body: B) -> Outcome
    where
        B: Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match contain(self.middleware.run(req, res)).await {
            Ok(ChainOutcome::ShortCircuited) => return Outcome::ShortCircuited,
            Ok(ChainOutcome::Continue) => {}
            Err(failure) => {
                tracing::error!(
                    error = %failure,
                    panicked = failure.is_panic(),
                    backtrace = %failure.backtrace(),
                    "Middleware failed"
                );
                return fail(res);
            }
        }

        let Some(handler) = self.routes.resolve(req.method(), req.path()) else {
            tracing::debug!("No route matched");
            res.status(StatusCode::NOT_FOUND).send("Not Found");
            return Outcome::NotFound;
        };

        match read_body(body, self.max_body_size).await {
            Ok(raw) => req.set_body(&raw),
            Err(err @ BodyError::TooLarge { .. }) => {
                tracing::warn!(error = %err, "Request body rejected");
                res.status(StatusCode::PAYLOAD_TOO_LARGE).send("Payload Too Large");
                return Outcome::Rejected;
            }
            Err(err @ BodyError::Read(_)) => {
                tracing::warn!(error = %err, "Request body unreadable");
                res.status(StatusCode::BAD_REQUEST).send("Bad Request");
                return Outcome::Rejected;
            }
        }

        match contain(handler.call(req.clone(), res.clone())).await {
            Ok(()) => {
                if !res.is_finished() {
                    tracing::debug!("Handler returned without a terminal write");
                }
                Outcome::Handled
            }
            Err(failure) => {
                tracing::error!(
                    error = %failure,
                    panicked = failure.is_panic(),
                    backtrace = %failure.backtrace(),
                    "Route handler failed"
                );
                fail(res)
            }
        }
    }
}

fn fail(res: &ResponseContext) -> Outcome {
    if res.is_finished() {
        tracing::warn!("Response was already written before the failure; keeping it");
    } else {
        res.status(StatusCode::INTERNAL_SERVER_ERROR)
            .send("Internal Server Error");
    }
    Outcome::Errored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use http::header::CONTENT_TYPE;
    use http::Method;
    use http_body_util::{BodyExt, StreamBody};
    use hyper::body::Frame;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn dispatcher(middleware: MiddlewareChain, routes: RouteTable) -> Dispatcher {
        Dispatcher::new(middleware, routes, &LimitsConfig { max_body_size: 64 })
    }

    fn request(method: Method, uri: &str, body: &'static str) -> Request<Full<Bytes>> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn text(dispatched: Dispatched) -> (StatusCode, String) {
        let status = dispatched.response.status();
        let bytes = dispatched.response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn matched_route_is_invoked() {
        let mut routes = RouteTable::new();
        routes.add_route(Method::GET, "/", |_req, res: ResponseContext| async move {
            res.send("home");
            Ok(())
        });

        let d = dispatcher(MiddlewareChain::new(), routes);
        let dispatched = d.dispatch(request(Method::GET, "/", "")).await;

        assert_eq!(dispatched.outcome, Outcome::Handled);
        assert_eq!(text(dispatched).await, (StatusCode::OK, "home".to_string()));
    }

    #[tokio::test]
    async fn unmatched_request_is_404() {
        let mut routes = RouteTable::new();
        routes.add_route(Method::GET, "/data", |_req, res: ResponseContext| async move {
            res.send("data");
            Ok(())
        });
        let d = dispatcher(MiddlewareChain::new(), routes);

        for (method, uri) in [(Method::GET, "/missing"), (Method::POST, "/data"), (Method::GET, "/data/")] {
            let dispatched = d.dispatch(request(method, uri, "")).await;
            assert_eq!(dispatched.outcome, Outcome::NotFound);
            assert_eq!(
                dispatched.response.headers()[CONTENT_TYPE],
                "text/plain"
            );
            assert_eq!(text(dispatched).await, (StatusCode::NOT_FOUND, "Not Found".to_string()));
        }
    }

    #[tokio::test]
    async fn failing_handler_is_500_and_dispatcher_keeps_serving() {
        let mut routes = RouteTable::new();
        routes.add_route(Method::GET, "/boom", |_req, _res| async move {
            Err::<(), _>(HandlerError::msg("database unavailable"))
        });
        routes.add_route(Method::GET, "/panic", |_req, _res| async move {
            if true {
                panic!("handler bug");
            }
            Ok(())
        });
        routes.add_route(Method::GET, "/ok", |_req, res: ResponseContext| async move {
            res.send("fine");
            Ok(())
        });
        let d = dispatcher(MiddlewareChain::new(), routes);

        for uri in ["/boom", "/panic"] {
            let dispatched = d.dispatch(request(Method::GET, uri, "")).await;
            assert_eq!(dispatched.outcome, Outcome::Errored);
            assert_eq!(
                text(dispatched).await,
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            );
        }

        let dispatched = d.dispatch(request(Method::GET, "/ok", "")).await;
        assert_eq!(text(dispatched).await, (StatusCode::OK, "fine".to_string()));
    }

    #[tokio::test]
    async fn finishing_middleware_skips_route() {
        let route_calls = Arc::new(AtomicUsize::new(0));
        let mut middleware = MiddlewareChain::new();
        middleware.register(|req: RequestContext, res: ResponseContext| async move {
            if req.header("authorization").is_none() {
                res.status(StatusCode::UNAUTHORIZED).send("Unauthorized");
            }
            Ok(())
        });

        let calls = route_calls.clone();
        let mut routes = RouteTable::new();
        routes.add_route(Method::GET, "/", move |_req, res: ResponseContext| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                res.send("secret");
                Ok(())
            }
        });
        let d = dispatcher(middleware, routes);

        let dispatched = d.dispatch(request(Method::GET, "/", "")).await;
        assert_eq!(dispatched.outcome, Outcome::ShortCircuited);
        assert_eq!(text(dispatched).await, (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()));
        assert_eq!(route_calls.load(Ordering::SeqCst), 0);

        let authorized = Request::builder()
            .uri("/")
            .header("authorization", "Bearer t")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let dispatched = d.dispatch(authorized).await;
        assert_eq!(dispatched.outcome, Outcome::Handled);
        assert_eq!(route_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn end_in_middleware_short_circuits_with_empty_body() {
        let mut middleware = MiddlewareChain::new();
        middleware.register(|_req, res: ResponseContext| async move {
            res.status(StatusCode::NO_CONTENT).end();
            Ok(())
        });
        let mut routes = RouteTable::new();
        routes.add_route(Method::GET, "/", |_req, res: ResponseContext| async move {
            res.send("unreachable");
            Ok(())
        });
        let d = dispatcher(middleware, routes);

        let dispatched = d.dispatch(request(Method::GET, "/", "")).await;
        assert_eq!(dispatched.outcome, Outcome::ShortCircuited);
        assert_eq!(text(dispatched).await, (StatusCode::NO_CONTENT, String::new()));
    }

    #[tokio::test]
    async fn failing_middleware_is_contained() {
        let mut middleware = MiddlewareChain::new();
        middleware.register(|_req, _res| async move { Err::<(), _>(HandlerError::msg("audit log down")) });
        let mut routes = RouteTable::new();
        routes.add_route(Method::GET, "/", |_req, res: ResponseContext| async move {
            res.send("home");
            Ok(())
        });
        let d = dispatcher(middleware, routes);

        let dispatched = d.dispatch(request(Method::GET, "/", "")).await;
        assert_eq!(dispatched.outcome, Outcome::Errored);
        assert_eq!(
            text(dispatched).await,
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
        );
    }

    #[tokio::test]
    async fn body_is_parsed_before_handler_runs() {
        let seen_by_middleware = Arc::new(Mutex::new(None));
        let mut middleware = MiddlewareChain::new();
        let seen = seen_by_middleware.clone();
        middleware.register(move |req: RequestContext, _res| {
            let seen = seen.clone();
            async move {
                *seen.lock().unwrap() = Some(req.body_ready());
                Ok(())
            }
        });
        let mut routes = RouteTable::new();
        routes.add_route(Method::POST, "/data", |req: RequestContext, res: ResponseContext| async move {
            res.json(req.body())
        });
        let d = dispatcher(middleware, routes);

        let dispatched = d.dispatch(request(Method::POST, "/data", "a=1&b=2")).await;
        assert_eq!(dispatched.outcome, Outcome::Handled);
        assert_eq!(
            dispatched.response.headers()[CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(text(dispatched).await, (StatusCode::OK, r#"{"a":"1","b":"2"}"#.to_string()));
        assert_eq!(*seen_by_middleware.lock().unwrap(), Some(false));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut routes = RouteTable::new();
        routes.add_route(Method::POST, "/data", |_req, res: ResponseContext| async move {
            res.send("accepted");
            Ok(())
        });
        let d = dispatcher(MiddlewareChain::new(), routes);

        let big = "k=".to_string() + &"v".repeat(100);
        let req = Request::builder()
            .method(Method::POST)
            .uri("/data")
            .body(Full::new(Bytes::from(big)))
            .unwrap();
        let dispatched = d.dispatch(req).await;

        assert_eq!(dispatched.outcome, Outcome::Rejected);
        assert_eq!(
            text(dispatched).await,
            (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large".to_string())
        );
    }

    #[tokio::test]
    async fn broken_body_stream_is_bad_request() {
        let mut routes = RouteTable::new();
        routes.add_route(Method::POST, "/data", |_req, res: ResponseContext| async move {
            res.send("accepted");
            Ok(())
        });
        let d = dispatcher(MiddlewareChain::new(), routes);

        let chunks: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"a=1"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let body = StreamBody::new(futures_util::stream::iter(chunks));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/data")
            .body(body)
            .unwrap();
        let dispatched = d.dispatch(req).await;

        assert_eq!(dispatched.outcome, Outcome::Rejected);
        assert_eq!(text(dispatched).await, (StatusCode::BAD_REQUEST, "Bad Request".to_string()));
    }

    #[tokio::test]
    async fn handler_without_terminal_write_gets_pending_status() {
        let mut routes = RouteTable::new();
        routes.add_route(Method::DELETE, "/item", |_req, res: ResponseContext| async move {
            res.status(StatusCode::ACCEPTED);
            Ok(())
        });
        let d = dispatcher(MiddlewareChain::new(), routes);

        let dispatched = d.dispatch(request(Method::DELETE, "/item", "")).await;
        assert_eq!(dispatched.outcome, Outcome::Handled);
        assert_eq!(text(dispatched).await, (StatusCode::ACCEPTED, String::new()));
    }

    #[tokio::test]
    async fn failure_after_write_keeps_written_response() {
        let mut routes = RouteTable::new();
        routes.add_route(Method::GET, "/", |_req, res: ResponseContext| async move {
            res.send("partial success");
            Err::<(), _>(HandlerError::msg("cleanup failed"))
        });
        let d = dispatcher(MiddlewareChain::new(), routes);

        let dispatched = d.dispatch(request(Method::GET, "/", "")).await;
        assert_eq!(dispatched.outcome, Outcome::Errored);
        assert_eq!(text(dispatched).await, (StatusCode::OK, "partial success".to_string()));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(Outcome::ShortCircuited.to_string(), "short_circuited");
        assert_eq!(Outcome::NotFound.as_str(), "not_found");
    }
}
