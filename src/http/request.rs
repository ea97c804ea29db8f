//! Request context: one inbound request as seen by handlers.
//!
//! # Responsibilities
//! - Tag each request with a unique id for log correlation
//! - Parse query parameters synchronously from the URI
//! - Accumulate the body stream and parse it as a form once it ends
//!
//! # Design Decisions
//! - Cheap to clone; every clone shares the same underlying request
//! - The body is filled in exactly once, by the dispatcher, before the
//!   route handler runs. Middleware observes an empty body.
//! - Decoding is best-effort: malformed input yields partial data, never
//!   an error

use std::sync::{Arc, LazyLock, OnceLock};

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use hyper::body::Body;
use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

/// Decoded key/value pairs in first-seen order. Duplicate keys keep the
/// last value at the position of the first.
pub type Params = IndexMap<String, String>;

static NO_PARAMS: LazyLock<Params> = LazyLock::new(Params::new);

/// Failure while reading a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body exceeded the configured limit.
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// The body stream failed before it ended.
    #[error("failed to read request body: {0}")]
    Read(Box<dyn std::error::Error + Send + Sync>),
}

/// Parse `application/x-www-form-urlencoded` text.
///
/// Also used for query strings, which follow the same rules.
pub fn parse_form(input: &[u8]) -> Params {
    url::form_urlencoded::parse(input)
        .into_owned()
        .collect()
}

/// Drain a body stream, refusing more than `limit` bytes.
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(BodyError::TooLarge { limit })
        }
        Err(err) => Err(BodyError::Read(err)),
    }
}

#[derive(Debug)]
struct Inner {
    id: Uuid,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    query: Params,
    body: OnceLock<Params>,
}

/// Handle to the request being dispatched.
#[derive(Debug, Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

impl RequestContext {
    /// Build a context from the request head. Query parameters are parsed here.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        let query = uri
            .query()
            .map(|q| parse_form(q.as_bytes()))
            .unwrap_or_default();

        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                method,
                uri,
                headers,
                query,
                body: OnceLock::new(),
            }),
        }
    }

    /// Unique id of this request.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Full request URI, including the query string.
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// Path component of the URI, without the query string.
    pub fn path(&self) -> &str {
        self.inner.uri.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Header value by name (case-insensitive). Non-UTF-8 values are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    pub fn query(&self) -> &Params {
        &self.inner.query
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.inner.query.get(name).map(String::as_str)
    }

    /// Parsed form body. Empty until the body has been read.
    pub fn body(&self) -> &Params {
        self.inner.body.get().unwrap_or_else(|| &*NO_PARAMS)
    }

    pub fn body_param(&self, name: &str) -> Option<&str> {
        self.body().get(name).map(String::as_str)
    }

    /// Whether the body stream has been fully consumed and parsed.
    pub fn body_ready(&self) -> bool {
        self.inner.body.get().is_some()
    }

    /// Store the raw body, parsed as a form. Only the first call has an effect.
    pub(crate) fn set_body(&self, raw: &[u8]) {
        if self.inner.body.set(parse_form(raw)).is_err() {
            tracing::warn!(request_id = %self.inner.id, "Request body already parsed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    fn context(uri: &str) -> RequestContext {
        RequestContext::new(Method::GET, uri.parse().unwrap(), HeaderMap::new())
    }

    #[test]
    fn query_is_parsed_at_construction() {
        let req = context("/search?q=rust+lang&page=2");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_param("q"), Some("rust lang"));
        assert_eq!(req.query_param("page"), Some("2"));
    }

    #[test]
    fn duplicate_keys_keep_last_value() {
        let req = context("/?a=1&a=2");
        assert_eq!(req.query_param("a"), Some("2"));
        assert_eq!(req.query().len(), 1);
    }

    #[test]
    fn missing_query_is_empty() {
        let req = context("/plain");
        assert!(req.query().is_empty());
    }

    #[test]
    fn malformed_form_is_best_effort() {
        let params = parse_form(b"a=%ZZ&&b&=c&d=%41");
        assert_eq!(params.get("a").map(String::as_str), Some("%ZZ"));
        assert_eq!(params.get("b").map(String::as_str), Some(""));
        assert_eq!(params.get("d").map(String::as_str), Some("A"));
    }

    #[test]
    fn keys_keep_first_seen_order() {
        let params = parse_form(b"b=2&a=1&c=3&b=4");
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(params.get("b").map(String::as_str), Some("4"));
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"{"b":"4","a":"1","c":"3"}"#);
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let params = parse_form(b"a=\xff\xfe&b=2");
        assert_eq!(params.get("a").map(String::as_str), Some("\u{fffd}\u{fffd}"));
        assert_eq!(params.get("b").map(String::as_str), Some("2"));

        let params = parse_form(b"%FF=x");
        assert_eq!(params.get("\u{fffd}").map(String::as_str), Some("x"));
    }

    #[test]
    fn body_is_empty_until_set() {
        let req = context("/data");
        assert!(!req.body_ready());
        assert!(req.body().is_empty());

        req.set_body(b"a=1&b=2");
        assert!(req.body_ready());
        assert_eq!(req.body_param("a"), Some("1"));
        assert_eq!(req.body_param("b"), Some("2"));

        // clones observe the same body
        let clone = req.clone();
        assert_eq!(clone.body().len(), 2);
    }

    #[test]
    fn empty_body_parses_to_empty_map() {
        let req = context("/data");
        req.set_body(b"");
        assert!(req.body_ready());
        assert!(req.body().is_empty());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trace", "abc".parse().unwrap());
        let req = RequestContext::new(Method::GET, "/".parse().unwrap(), headers);
        assert_eq!(req.header("X-Trace"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }

    #[tokio::test]
    async fn read_body_enforces_limit() {
        let ok = read_body(Full::new(Bytes::from_static(b"x=5")), 16).await.unwrap();
        assert_eq!(&ok[..], b"x=5");

        let err = read_body(Full::new(Bytes::from(vec![b'a'; 32])), 16)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 16 }));
    }
}
