//! The read-only view of an incoming request handed to patterns and
//! handlers.
//!
//! The transport that parses requests lives outside this crate; the mux
//! only needs the request head plus the collected body bytes. Patterns
//! must never mutate the request, which this type enforces by only
//! exposing shared references.

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// An immutable HTTP request as seen by the dispatch layer.
#[derive(Debug)]
pub struct RequestContext {
    parts: Parts,
    body: Bytes,
}

impl RequestContext {
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self { parts, body }
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the HTTP version of the request
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the request body bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

impl From<Request<Bytes>> for RequestContext {
    fn from(req: Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }
}
