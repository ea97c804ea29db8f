//! Response context: the outgoing response as built by handlers.
//!
//! # Responsibilities
//! - Hold the pending status, headers and body of one response
//! - Provide the terminal writes (`send`, `json`, `end`)
//! - Track whether a terminal write already happened (`finished`)
//!
//! # Design Decisions
//! - Cheap to clone; clones share state, so middleware and the route
//!   handler all write into the same response
//! - Nothing is flushed to the socket here; the dispatcher converts the
//!   final state into a hyper response once the pipeline ends
//! - First terminal write wins; later ones are logged and dropped

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;

use crate::error::HandlerResult;

pub const TEXT_PLAIN: &str = "text/plain";
pub const APPLICATION_JSON: &str = "application/json";

#[derive(Debug)]
struct State {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    finished: bool,
}

/// Handle to the response being built for one request.
#[derive(Debug, Clone)]
pub struct ResponseContext {
    state: Arc<Mutex<State>>,
}

impl ResponseContext {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: Bytes::new(),
                finished: false,
            })),
        }
    }

    // Handlers cannot panic while holding the lock, but recover anyway.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the status used by the next terminal write.
    pub fn status(&self, status: StatusCode) -> &Self {
        self.lock().status = status;
        self
    }

    /// Set an extra response header.
    pub fn header(&self, name: HeaderName, value: HeaderValue) -> &Self {
        self.lock().headers.insert(name, value);
        self
    }

    /// Finish the response with a plain-text body.
    pub fn send(&self, text: impl Into<String>) {
        self.finish(TEXT_PLAIN, Bytes::from(text.into()));
    }

    /// Finish the response with `value` serialized as JSON.
    ///
    /// On serialization failure the response stays unfinished.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> HandlerResult {
        let body = serde_json::to_vec(value)?;
        self.finish(APPLICATION_JSON, Bytes::from(body));
        Ok(())
    }

    /// Mark the response finished without writing a body.
    pub fn end(&self) {
        let mut state = self.lock();
        if state.finished {
            tracing::warn!("end() called on a finished response");
            return;
        }
        state.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    pub fn current_status(&self) -> StatusCode {
        self.lock().status
    }

    fn finish(&self, content_type: &'static str, body: Bytes) {
        let mut state = self.lock();
        if state.finished {
            tracing::warn!(
                status = %state.status,
                "Response already finished, dropping second write"
            );
            return;
        }
        state
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        state.body = body;
        state.finished = true;
    }

    /// Move the accumulated state out into a hyper response.
    pub(crate) fn take_response(&self) -> Response<Full<Bytes>> {
        let mut state = self.lock();
        let mut response = Response::new(Full::new(std::mem::take(&mut state.body)));
        *response.status_mut() = state.status;
        *response.headers_mut() = std::mem::take(&mut state.headers);
        response
    }
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}
