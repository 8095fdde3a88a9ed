//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method, Uri};
use http_body_util::BodyExt;

use crate::error::Error;

/// An incoming HTTP request with its body already read.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) remote_addr: SocketAddr,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Builds a request by hand. Useful for driving handlers in tests.
    pub fn new(method: Method, uri: Uri, remote_addr: SocketAddr) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr,
            params: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Reads the whole body of a hyper request and attaches the peer address.
    pub(crate) async fn from_hyper(
        req: hyper::Request<hyper::body::Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<Self, Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            remote_addr,
            params: HashMap::new(),
        })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The request target as the client sent it, e.g. `/v1/endpoints?page=2`.
    pub fn url(&self) -> String {
        self.uri.to_string()
    }

    /// The peer address of the connection the request arrived on.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII are
    /// reported as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "10.0.0.5:4321".parse().unwrap()
    }

    #[test]
    fn url_keeps_path_and_query() {
        let req = Request::new(Method::GET, Uri::from_static("/v1/endpoints?page=2"), peer());
        assert_eq!(req.url(), "/v1/endpoints?page=2");
        assert_eq!(req.path(), "/v1/endpoints");
        assert_eq!(req.remote_addr().to_string(), "10.0.0.5:4321");
    }

    #[test]
    fn header_lookup_ignores_case() {
        let req = Request::new(Method::POST, Uri::from_static("/"), peer())
            .with_header(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body("{}");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header("x-missing"), None);
        assert_eq!(req.body(), b"{}");
    }

    #[test]
    fn missing_param_is_none() {
        let req = Request::new(Method::GET, Uri::from_static("/"), peer());
        assert_eq!(req.param("id"), None);
    }
}
