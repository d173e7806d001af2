//! The resource router seam.
//!
//! The router is the protocol agnostic processing core: it reads the canonical
//! parameters and the query vector and leaves a status, headers and a body in
//! the [`StreamState`]. Leaving no status means "no reply for this request".

use http::StatusCode;

use crate::protocol::{BridgeError, CanonicalParams, QueryVector, StreamState};

#[cfg_attr(test, mockall::automock)]
pub trait ResourceRouter: Send + Sync {
    /// Entry point for every path except the well-known ones.
    fn handle_root(&self, params: &CanonicalParams, query: &QueryVector, stream: &mut StreamState) -> Result<(), BridgeError>;

    /// Entry point for paths below the well-known prefix.
    fn handle_well_known(&self, _params: &CanonicalParams, stream: &mut StreamState) -> Result<(), BridgeError> {
        stream.reply(StatusCode::NOT_FOUND, b"");
        Ok(())
    }
}

/// A router built from a closure serving the root entry point.
#[derive(Debug)]
pub struct RouterFn<F> {
    f: F,
}

impl<F> ResourceRouter for RouterFn<F>
where
    F: Fn(&CanonicalParams, &QueryVector, &mut StreamState) -> Result<(), BridgeError> + Send + Sync,
{
    fn handle_root(&self, params: &CanonicalParams, query: &QueryVector, stream: &mut StreamState) -> Result<(), BridgeError> {
        (self.f)(params, query, stream)
    }
}

pub fn router_fn<F>(f: F) -> RouterFn<F>
where
    F: Fn(&CanonicalParams, &QueryVector, &mut StreamState) -> Result<(), BridgeError> + Send + Sync,
{
    RouterFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_router_serves_root() {
        let router = router_fn(|params, query, stream| {
            let body = format!("{} {}", params.method().unwrap_or("-"), query.len());
            stream.reply(StatusCode::OK, body.as_bytes());
            Ok(())
        });

        let mut params = CanonicalParams::new();
        params.set("REQUEST_METHOD", "GET").unwrap();
        let mut query = QueryVector::new();
        query.push("depth", "1");
        let mut stream = StreamState::new();

        router.handle_root(&params, &query, &mut stream).unwrap();
        assert_eq!(stream.status(), Some(StatusCode::OK));
        assert_eq!(stream.body(), b"GET 1");
    }

    #[test]
    fn well_known_defaults_to_not_found() {
        let router = router_fn(|_, _, _| Ok(()));
        let mut stream = StreamState::new();

        router.handle_well_known(&CanonicalParams::new(), &mut stream).unwrap();
        assert_eq!(stream.status(), Some(StatusCode::NOT_FOUND));
    }
}
