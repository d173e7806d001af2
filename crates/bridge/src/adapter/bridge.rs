use bytes::{Bytes, BytesMut};
use std::fmt;
use tokio_util::codec::Encoder;
use tracing::{debug, error, warn};

use crate::BridgeConfig;
use crate::adapter::context::ConnectionContext;
use crate::adapter::errors::{ErrorDescriptor, ErrorEncoding, ErrorResponder, RestconfErrors};
use crate::adapter::fallback::{ErrorFallback, LastError};
use crate::adapter::translate::translate_request;
use crate::adapter::upgrade::negotiate_upgrade;
use crate::codec::{KeepAlivePolicy, ReplyEncoder};
use crate::handler::ResourceRouter;
use crate::protocol::{
    BridgeError, CanonicalParams, InboundRequest, ParamsDisposition, ProtocolVersion, QueryVector, Reply, StreamState,
    TlsSession, UpgradeState,
};

const CERT_VERIFICATION_FAILED: &str = "HTTP cert verification failed";

/// Result of handling one request.
#[derive(Debug)]
pub struct Exchange {
    /// Framed reply bytes; `None` when nothing produced a status.
    pub reply: Option<Bytes>,
    /// Whether the parameter set was cleared or must outlive the request.
    pub params: ParamsDisposition,
    pub upgrade: UpgradeState,
    /// Settings payload sent with an accepted upgrade.
    pub settings: Option<Bytes>,
    /// The engine must close the connection after writing `reply`.
    pub close: bool,
}

impl Exchange {
    #[inline]
    pub fn is_upgraded(&self) -> bool {
        self.upgrade == UpgradeState::Switched
    }
}

/// How far a request got before its reply was settled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Served {
    Routed,
    /// Answered with a client error, the router did not run.
    Refused,
    /// Refused and the connection must go away.
    Rejected,
    Upgraded,
}

/// Ties translation, upgrade negotiation, routing and reply framing together.
///
/// A `Bridge` is immutable once built and is shared by every connection of a
/// server; all per-request state lives in the [`ConnectionContext`] and in the
/// parameter set created for each request.
pub struct Bridge<R, E = RestconfErrors> {
    config: BridgeConfig,
    router: R,
    responder: E,
}

impl<R: ResourceRouter> Bridge<R> {
    pub fn new(config: BridgeConfig, router: R) -> Self {
        Self { config, router, responder: RestconfErrors }
    }
}

impl<R, E> Bridge<R, E>
where
    R: ResourceRouter,
    E: ErrorResponder,
{
    pub fn with_responder(config: BridgeConfig, router: R, responder: E) -> Self {
        Self { config, router, responder }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    fn keep_alive_policy(&self) -> KeepAlivePolicy {
        if self.config.legacy_keep_alive_echo { KeepAlivePolicy::LegacyEcho } else { KeepAlivePolicy::Standard }
    }

    /// Runs one request through the adapter and frames its reply.
    ///
    /// Client errors are answered in place with a structured error. Server
    /// side failures at any stage end in a `500` from the [`ErrorFallback`];
    /// the connection stays usable in both cases.
    pub fn handle(&self, ctx: &mut ConnectionContext, request: &InboundRequest) -> Exchange {
        let conn = ctx.id();
        debug!(%conn, method = %request.method(), uri = ?request.uri(), proto = %request.proto(), "request begins");

        let (tls, stream, last_error) = ctx.parts_mut();
        stream.begin(ProtocolVersion::from(request.proto()), request.keep_alive(), request.body().clone());

        let mut params = CanonicalParams::new();
        let served = match self.serve(request, tls, stream, &mut params) {
            Ok(served) => served,
            Err(e) => {
                error!(%conn, cause = %e, "request escalated to fallback");
                last_error.record(&e);
                ErrorFallback.respond(last_error, stream);
                Served::Refused
            }
        };

        let params = if served == Served::Upgraded {
            ParamsDisposition::Retained(params)
        } else {
            params.clear();
            ParamsDisposition::Cleared
        };

        let reply = match stream.take_reply() {
            Some(reply) => self.frame(reply, stream, last_error),
            None => {
                debug!(%conn, "no status set, nothing to send");
                None
            }
        };

        let upgrade = stream.upgrade();
        let settings = stream.take_settings();
        let close = !stream.keep_alive() || served == Served::Rejected;
        stream.reset();

        if served == Served::Rejected {
            ctx.request_exit();
        }
        debug!(%conn, ?upgrade, close, retained = params.is_retained(), "request done");
        Exchange { reply, params, upgrade, settings, close }
    }

    fn serve(
        &self,
        request: &InboundRequest,
        tls: Option<&TlsSession>,
        stream: &mut StreamState,
        params: &mut CanonicalParams,
    ) -> Result<Served, BridgeError> {
        // the router borrows the query vector next to the stream it writes to
        let mut query = std::mem::take(stream.query_mut());
        let result = self.route(request, tls, stream, params, &mut query);
        *stream.query_mut() = query;
        result
    }

    fn route(
        &self,
        request: &InboundRequest,
        tls: Option<&TlsSession>,
        stream: &mut StreamState,
        params: &mut CanonicalParams,
        query: &mut QueryVector,
    ) -> Result<Served, BridgeError> {
        if let Err(e) = translate_request(request, tls, params, query) {
            self.client_error(e, stream)?;
            return Ok(Served::Refused);
        }

        if self.config.verify_client_certs && tls.is_some_and(|session| !session.is_verified()) {
            warn!(subject = ?tls.and_then(TlsSession::subject), "client certificate did not verify");
            let descriptor = ErrorDescriptor::access_denied(CERT_VERIFICATION_FAILED);
            self.responder.build(&descriptor, ErrorEncoding::default(), self.config.pretty, stream)?;
            return Ok(Served::Rejected);
        }

        match negotiate_upgrade(&self.config, params, stream, &self.responder)? {
            UpgradeState::Switched => return Ok(Served::Upgraded),
            UpgradeState::ErrorSent => return Ok(Served::Refused),
            UpgradeState::NoUpgrade => {}
        }

        let path = params.uri().unwrap_or_default();
        if self.config.is_well_known(path) {
            self.router.handle_well_known(params, stream)?;
        } else {
            self.router.handle_root(params, query, stream)?;
        }
        Ok(Served::Routed)
    }

    /// Answers a client error with a structured reply, passes anything else on.
    fn client_error(&self, e: BridgeError, stream: &mut StreamState) -> Result<(), BridgeError> {
        let Some(descriptor) = ErrorDescriptor::from_client_error(&e) else {
            return Err(e);
        };
        warn!(cause = %e, status = descriptor.status.as_u16(), "client error");
        self.responder.build(&descriptor, ErrorEncoding::default(), self.config.pretty, stream)
    }

    fn frame(&self, reply: Reply, stream: &mut StreamState, last_error: &mut LastError) -> Option<Bytes> {
        let mut encoder = ReplyEncoder::with_policy(self.keep_alive_policy());
        let mut dst = BytesMut::new();

        let Err(e) = encoder.encode(reply, &mut dst) else {
            return Some(dst.freeze());
        };

        let e = BridgeError::from(e);
        error!(cause = %e, "failed to frame reply");
        last_error.record(&e);
        ErrorFallback.respond(last_error, stream);

        let fallback = stream.take_reply()?;
        dst.clear();
        match encoder.encode(fallback, &mut dst) {
            Ok(()) => Some(dst.freeze()),
            Err(e) => {
                error!(cause = %e, "failed to frame fallback reply");
                None
            }
        }
    }
}

impl<R, E> fmt::Debug for Bridge<R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
    use serde_json::Value;

    use super::*;
    use crate::handler::MockResourceRouter;
    use crate::protocol::HttpProto;
    use crate::protocol::params::{HTTP_HTTP2_SETTINGS, HTTP_UPGRADE, REQUEST_METHOD, REQUEST_URI, SSL_CN};

    fn request(uri: &'static str, headers: &[(&'static str, &'static str)]) -> InboundRequest {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(*value));
        }
        InboundRequest::builder().method(Method::GET).uri(Uri::from_static(uri)).headers(map).build()
    }

    fn split(reply: &Bytes) -> (String, Vec<u8>) {
        let end = reply.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        (String::from_utf8(reply[..end + 2].to_vec()).unwrap(), reply[end + 4..].to_vec())
    }

    fn error_message(body: &[u8]) -> String {
        let body: Value = serde_json::from_slice(body).unwrap();
        body["ietf-restconf:errors"]["error"][0]["error-message"].as_str().unwrap().to_owned()
    }

    #[test]
    fn get_reaches_the_router() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().times(1).returning(|params, query, stream| {
            assert_eq!(params.get(REQUEST_METHOD), Some("GET"));
            assert_eq!(params.get(REQUEST_URI), Some("/a/b"));
            assert_eq!(query.get_all("x").collect::<Vec<_>>(), vec!["1"]);
            assert_eq!(query.get("y"), Some("2"));
            stream.add_header("Content-Type", "text/plain")?;
            stream.reply(StatusCode::OK, b"0123456789");
            Ok(())
        });
        router.expect_handle_well_known().never();

        let bridge = Bridge::new(BridgeConfig::default(), router);
        let mut ctx = ConnectionContext::new();
        let exchange = bridge.handle(&mut ctx, &request("/a/b?x=1&y=2", &[("host", "localhost")]));

        let (head, body) = split(exchange.reply.as_ref().unwrap());
        assert_eq!(head, "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 10\r\n");
        assert_eq!(body, b"0123456789");
        assert_eq!(exchange.params, ParamsDisposition::Cleared);
        assert!(!exchange.close);
        assert!(ctx.stream().status().is_none());
    }

    #[test]
    fn foreign_version_is_answered_before_the_router_and_keeps_the_connection() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().never();

        let request = InboundRequest::builder()
            .method(Method::GET)
            .uri(Uri::from_static("/restconf/data"))
            .proto(HttpProto::new(2, 5))
            .build();
        let mut ctx = ConnectionContext::new();
        let exchange = Bridge::new(BridgeConfig::default(), router).handle(&mut ctx, &request);

        let (head, body) = split(exchange.reply.as_ref().unwrap());
        assert!(head.starts_with("HTTP/1.0 400 Bad Request\r\n"), "{head}");
        assert!(head.contains("Content-Type: application/yang-data+json\r\n"));
        assert!(head.contains("Connection: keep-alive\r\n"));
        assert_eq!(error_message(&body), "Invalid HTTP version number");
        assert_eq!(exchange.params, ParamsDisposition::Cleared);
        assert!(!exchange.close);
        assert!(!ctx.should_exit());
    }

    #[test]
    fn accept_does_not_change_the_version_error_encoding() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().never();

        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/yang-data+xml"));
        let request = InboundRequest::builder()
            .uri(Uri::from_static("/restconf"))
            .proto(HttpProto::new(2, 5))
            .headers(headers)
            .build();
        let exchange = Bridge::new(BridgeConfig::default(), router).handle(&mut ConnectionContext::new(), &request);

        let (head, _) = split(exchange.reply.as_ref().unwrap());
        assert!(head.contains("application/yang-data+json"));
    }

    #[test]
    fn h2c_upgrade_switches_and_retains_params() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().never();

        let config = BridgeConfig::builder().h2c_upgrade(true).build();
        let request = request("/", &[
            ("connection", "Upgrade, HTTP2-Settings"),
            ("upgrade", "h2c"),
            ("http2-settings", "AAMAAABkAAQAAP__"),
        ]);
        let mut ctx = ConnectionContext::new();
        let exchange = Bridge::new(config, router).handle(&mut ctx, &request);

        assert_eq!(
            &exchange.reply.as_ref().unwrap()[..],
            b"HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nUpgrade: h2c\r\n\r\n"
        );
        assert!(exchange.is_upgraded());
        assert!(!exchange.close);
        assert_eq!(exchange.settings.as_deref(), Some(&b"AAMAAABkAAQAAP__"[..]));

        let params = exchange.params.retained().unwrap();
        assert_eq!(params.get(HTTP_UPGRADE), Some("h2c"));
        assert_eq!(params.get(HTTP_HTTP2_SETTINGS), Some("AAMAAABkAAQAAP__"));
        assert_eq!(params.get(REQUEST_URI), Some("/"));
    }

    #[test]
    fn invalid_upgrade_token_is_refused() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().never();

        let config = BridgeConfig::builder().h2c_upgrade(true).build();
        let exchange = Bridge::new(config, router).handle(&mut ConnectionContext::new(), &request("/", &[("upgrade", "foo")]));

        let (head, body) = split(exchange.reply.as_ref().unwrap());
        assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert_eq!(error_message(&body), "Invalid upgrade token");
        assert_eq!(exchange.upgrade, UpgradeState::ErrorSent);
        assert_eq!(exchange.params, ParamsDisposition::Cleared);
        assert!(!exchange.close);
    }

    #[test]
    fn upgrade_header_is_ignored_when_disabled() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().times(1).returning(|params, _, stream| {
            assert_eq!(params.get(HTTP_UPGRADE), Some("h2c"));
            stream.reply(StatusCode::OK, b"");
            Ok(())
        });

        let exchange =
            Bridge::new(BridgeConfig::default(), router).handle(&mut ConnectionContext::new(), &request("/", &[("upgrade", "h2c")]));
        assert!(!exchange.is_upgraded());
        assert!(exchange.reply.unwrap().starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn malformed_query_is_a_client_error() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().never();

        let exchange =
            Bridge::new(BridgeConfig::default(), router).handle(&mut ConnectionContext::new(), &request("/data?depth=%zz", &[]));
        let (head, _) = split(exchange.reply.as_ref().unwrap());
        assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(!exchange.close);
    }

    #[test]
    fn router_failure_goes_to_the_fallback() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().times(2).returning(|params, _, stream| {
            if params.get("HTTP_X_FAIL").is_some() {
                stream.reply(StatusCode::OK, b"half written");
                return Err(BridgeError::internal("datastore locked"));
            }
            stream.reply(StatusCode::OK, b"fine");
            Ok(())
        });

        let bridge = Bridge::new(BridgeConfig::default(), router);
        let mut ctx = ConnectionContext::new();

        let exchange = bridge.handle(&mut ctx, &request("/", &[("x-fail", "1")]));
        let (head, body) = split(exchange.reply.as_ref().unwrap());
        assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert_eq!(body, b"internal error: datastore locked");
        assert!(!exchange.close);
        assert!(ctx.last_error().is_empty());

        // the connection keeps serving
        let exchange = bridge.handle(&mut ctx, &request("/", &[]));
        let (_, body) = split(exchange.reply.as_ref().unwrap());
        assert_eq!(body, b"fine");
    }

    #[test]
    fn framing_failure_goes_to_the_fallback() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().returning(|_, _, stream| {
            stream.reply(StatusCode::NO_CONTENT, b"not allowed");
            Ok(())
        });

        let exchange = Bridge::new(BridgeConfig::default(), router).handle(&mut ConnectionContext::new(), &request("/", &[]));
        let (head, body) = split(exchange.reply.as_ref().unwrap());
        assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(String::from_utf8(body).unwrap().contains("must not carry a body"));
    }

    #[test]
    fn no_status_means_no_reply() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().returning(|_, _, _| Ok(()));

        let exchange = Bridge::new(BridgeConfig::default(), router).handle(&mut ConnectionContext::new(), &request("/", &[]));
        assert!(exchange.reply.is_none());
        assert_eq!(exchange.params, ParamsDisposition::Cleared);
    }

    #[test]
    fn well_known_paths_use_their_entry_point() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().never();
        router.expect_handle_well_known().times(1).returning(|params, stream| {
            assert_eq!(params.uri(), Some("/.well-known/host-meta"));
            stream.reply(StatusCode::OK, b"<XRD/>");
            Ok(())
        });

        let exchange = Bridge::new(BridgeConfig::default(), router)
            .handle(&mut ConnectionContext::new(), &request("/.well-known/host-meta", &[]));
        assert!(exchange.reply.unwrap().starts_with(b"HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn tls_parameters_reach_the_router() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().times(1).returning(|params, _, stream| {
            assert_eq!(params.get("HTTPS"), Some("https"));
            assert_eq!(params.get(SSL_CN), Some("alice"));
            stream.reply(StatusCode::OK, b"");
            Ok(())
        });

        let mut ctx = ConnectionContext::with_tls(TlsSession::with_subject("/C=SE/CN=alice", true));
        let config = BridgeConfig::builder().verify_client_certs(true).build();
        let exchange = Bridge::new(config, router).handle(&mut ctx, &request("/", &[]));
        assert!(exchange.reply.is_some());
        assert!(!ctx.should_exit());
    }

    #[test]
    fn unverified_client_certificate_closes_the_connection() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().never();

        let mut ctx = ConnectionContext::with_tls(TlsSession::with_subject("/CN=mallory", false));
        let config = BridgeConfig::builder().verify_client_certs(true).build();
        let exchange = Bridge::new(config, router).handle(&mut ctx, &request("/", &[]));

        let (head, body) = split(exchange.reply.as_ref().unwrap());
        assert!(head.starts_with("HTTP/1.1 403 Forbidden\r\n"));
        assert_eq!(error_message(&body), CERT_VERIFICATION_FAILED);
        assert!(exchange.close);
        assert!(ctx.should_exit());
    }

    #[test]
    fn http11_close_intent() {
        let reply_ok = |router: &mut MockResourceRouter| {
            router.expect_handle_root().returning(|_, _, stream| {
                stream.reply(StatusCode::OK, b"");
                Ok(())
            });
        };

        let mut router = MockResourceRouter::new();
        reply_ok(&mut router);
        let exchange = Bridge::new(BridgeConfig::default(), router)
            .handle(&mut ConnectionContext::new(), &request("/", &[("connection", "close")]));
        let (head, _) = split(exchange.reply.as_ref().unwrap());
        assert!(head.contains("Connection: close\r\n"));
        assert!(exchange.close);

        let mut router = MockResourceRouter::new();
        reply_ok(&mut router);
        let config = BridgeConfig::builder().legacy_keep_alive_echo(true).build();
        let exchange = Bridge::new(config, router).handle(&mut ConnectionContext::new(), &request("/", &[("connection", "close")]));
        let (head, _) = split(exchange.reply.as_ref().unwrap());
        assert!(head.contains("Connection: keep-alive\r\n"));
        assert!(exchange.close);
    }

    #[test]
    fn http10_keep_alive() {
        let mut router = MockResourceRouter::new();
        router.expect_handle_root().returning(|_, _, stream| {
            stream.reply(StatusCode::OK, b"ok");
            Ok(())
        });
        let bridge = Bridge::new(BridgeConfig::default(), router);

        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        let request =
            InboundRequest::builder().uri(Uri::from_static("/")).proto(HttpProto::HTTP_10).headers(headers).build();

        let exchange = bridge.handle(&mut ConnectionContext::new(), &request);
        let (head, _) = split(exchange.reply.as_ref().unwrap());
        assert_eq!(head, "HTTP/1.0 200 OK\r\nContent-Length: 2\r\nConnection: keep-alive\r\n");
        assert!(!exchange.close);
    }
}
