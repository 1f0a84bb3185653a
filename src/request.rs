//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Method, Uri, Version};
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

/// Boxed error carried by request bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased request body.
///
/// Bodies from hyper connections and in-memory bodies built in tests end up as
/// the same type, so handlers and middleware never need to be generic over it.
pub type Body = UnsyncBoxBody<Bytes, BoxError>;

/// An incoming HTTP request.
///
/// The body is a stream. It is not read until someone asks for it, which lets
/// pass-through middleware forward a request without touching its bytes.
pub struct Request {
    parts: http::request::Parts,
    body: Body,
    params: HashMap<String, String>,
}

impl Request {
    /// Wraps any `http::Request` whose body yields [`Bytes`].
    ///
    /// ```rust
    /// use bytes::Bytes;
    /// use http_body_util::Full;
    ///
    /// let req = formecho::Request::new(
    ///     http::Request::post("/submit").body(Full::new(Bytes::new())).unwrap(),
    /// );
    /// assert_eq!(req.path(), "/submit");
    /// ```
    pub fn new<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self {
            parts,
            body: body.map_err(Into::into).boxed_unsync(),
            params: HashMap::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn uri(&self) -> &Uri { &self.parts.uri }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn version(&self) -> Version { self.parts.version }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }

    /// Case-insensitive header lookup. Returns `None` for non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name)?.to_str().ok()
    }

    /// The raw `content-type` header, if present and printable.
    pub fn content_type(&self) -> Option<&str> {
        self.parts.headers.get(CONTENT_TYPE)?.to_str().ok()
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Consumes the request, returning the body stream.
    pub fn into_body(self) -> Body {
        self.body
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .field("headers", &self.parts.headers)
            .finish_non_exhaustive()
    }
}
