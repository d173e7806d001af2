//! The engine-specific request handed to the adapter.
//!
//! The hosting engine has already parsed the request line and the headers and
//! buffered the whole body; nothing here performs I/O.

use bytes::Bytes;
use http::header::CONNECTION;
use http::{HeaderMap, Method, Uri};

use crate::protocol::HttpProto;

/// A fully received HTTP/1.x request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    uri: Option<Uri>,
    proto: HttpProto,
    headers: HeaderMap,
    body: Bytes,
}

impl InboundRequest {
    pub fn builder() -> InboundRequestBuilder {
        InboundRequestBuilder::new()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request target, absent when the engine could not make one out.
    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    pub fn proto(&self) -> HttpProto {
        self.proto
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the client wants the connection kept open after this exchange.
    ///
    /// HTTP/1.1 keeps alive unless `Connection: close` is sent, HTTP/1.0 only
    /// with an explicit `Connection: keep-alive`. Any other version is held to
    /// the HTTP/1.1 rule.
    pub fn keep_alive(&self) -> bool {
        match self.proto {
            HttpProto::HTTP_10 => self.connection_has("keep-alive"),
            _ => !self.connection_has("close"),
        }
    }

    fn connection_has(&self, token: &str) -> bool {
        self.headers
            .get_all(CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }
}

#[derive(Debug)]
pub struct InboundRequestBuilder {
    inner: InboundRequest,
}

impl InboundRequestBuilder {
    fn new() -> Self {
        Self {
            inner: InboundRequest {
                method: Method::GET,
                uri: None,
                proto: HttpProto::HTTP_11,
                headers: HeaderMap::new(),
                body: Bytes::new(),
            },
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.inner.method = method;
        self
    }

    pub fn uri(mut self, uri: Uri) -> Self {
        self.inner.uri = Some(uri);
        self
    }

    pub fn proto(mut self, proto: HttpProto) -> Self {
        self.inner.proto = proto;
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner.headers = headers;
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.inner.body = body;
        self
    }

    pub fn build(self) -> InboundRequest {
        self.inner
    }
}
