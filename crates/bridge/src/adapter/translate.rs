//! Translation of an inbound request into the canonical parameter model.

use tracing::debug;

use crate::adapter::header::normalize_headers;
use crate::ensure;
use crate::protocol::params::{HTTPS, REQUEST_METHOD, REQUEST_URI, SSL_CN};
use crate::protocol::{
    BridgeError, CanonicalParams, InboundRequest, ProtocolVersion, QueryVector, RequestMethod, TlsSession, decode_query,
};

/// Populates `params` and `query` from `request`.
///
/// The steps run in a fixed order and stop at the first error:
///
/// 1. the request must carry a URI with a path
/// 2. the method is mapped onto [`RequestMethod`]
/// 3. the query string, if any, is decoded into `query`
/// 4. `REQUEST_METHOD` and `REQUEST_URI` are set, the latter being the raw path
/// 5. the version must be HTTP/1.0 or HTTP/1.1
/// 6. a TLS session sets `HTTPS` and, when the subject has a `CN`, `SSL_CN`
/// 7. every header is copied as `HTTP_<NAME>`
///
/// Nothing is cleared here; on error the caller decides what happens to the
/// partially populated set.
pub fn translate_request(
    request: &InboundRequest,
    tls: Option<&TlsSession>,
    params: &mut CanonicalParams,
    query: &mut QueryVector,
) -> Result<ProtocolVersion, BridgeError> {
    let uri = request.uri().ok_or(BridgeError::malformed_uri("request has no uri"))?;
    let path = uri.path();
    ensure!(!path.is_empty(), BridgeError::malformed_uri("request uri has no path"));

    let method = RequestMethod::from(request.method());

    if let Some(raw) = uri.query() {
        decode_query(raw, query)?;
    }

    params.set(REQUEST_METHOD, method.as_str())?;
    params.set(REQUEST_URI, path)?;

    let proto = request.proto();
    let version = ProtocolVersion::from(proto);
    ensure!(version.is_known(), BridgeError::ProtocolVersion { major: proto.major, minor: proto.minor });

    if let Some(session) = tls {
        params.set(HTTPS, "https")?;
        if let Some(cn) = session.common_name() {
            params.set(SSL_CN, cn)?;
        }
    }

    normalize_headers(params, request.headers())?;

    debug!(method = %method, path, params = params.len(), query = query.len(), "translated request");
    Ok(version)
}
