//! A small in-memory RESTCONF datastore to put behind the bridge.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use bytes::Bytes;
use http::StatusCode;
use matchit::InsertError;
use micro_bridge::adapter::errors::{ErrorTag, ErrorType};
use micro_bridge::adapter::{ErrorDescriptor, ErrorEncoding, ErrorResponder, RestconfErrors};
use micro_bridge::handler::ResourceRouter;
use micro_bridge::protocol::{BridgeError, CanonicalParams, QueryVector, StreamState};
use tracing::{debug, error};

type InnerRouter<T> = matchit::Router<T>;

const HOST_META: &str = "<XRD xmlns=\"http://docs.oasis-open.org/ns/xri/xrd-1.0\">\n  \
     <Link rel=\"restconf\" href=\"/restconf\"/>\n</XRD>\n";

const ROOT_DOCUMENT: &str =
    r#"{"ietf-restconf:restconf":{"data":{},"operations":{},"yang-library-version":"2019-01-04"}}"#;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Resource {
    Root,
    Datastore,
    Node,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum WellKnown {
    HostMeta,
}

/// Routes `/restconf` paths onto a map of JSON documents keyed by data path.
pub struct DemoRouter {
    resources: InnerRouter<Resource>,
    well_known: InnerRouter<WellKnown>,
    store: Mutex<BTreeMap<String, Bytes>>,
    errors: RestconfErrors,
    pretty: bool,
}

impl DemoRouter {
    pub fn new(pretty: bool) -> Result<Self, InsertError> {
        let mut resources = InnerRouter::new();
        resources.insert("/restconf", Resource::Root)?;
        resources.insert("/restconf/data", Resource::Datastore)?;
        resources.insert("/restconf/data/{*path}", Resource::Node)?;

        let mut well_known = InnerRouter::new();
        well_known.insert("/.well-known/host-meta", WellKnown::HostMeta)?;

        Ok(Self { resources, well_known, store: Mutex::new(BTreeMap::new()), errors: RestconfErrors, pretty })
    }

    fn fail(&self, params: &CanonicalParams, error: &ErrorDescriptor, stream: &mut StreamState) -> Result<(), BridgeError> {
        let encoding = params.get("HTTP_ACCEPT").map(ErrorEncoding::from_accept).unwrap_or_default();
        self.errors.build(error, encoding, self.pretty, stream)
    }

    fn json(stream: &mut StreamState, status: StatusCode, body: &[u8]) -> Result<(), BridgeError> {
        stream.add_header("Content-Type", "application/yang-data+json")?;
        stream.reply(status, body);
        Ok(())
    }

    fn node(
        &self,
        params: &CanonicalParams,
        path: &str,
        query: &QueryVector,
        stream: &mut StreamState,
    ) -> Result<(), BridgeError> {
        let mut store = self.store.lock().map_err(|e| BridgeError::internal(format!("datastore poisoned: {e}")))?;
        let method = params.method().unwrap_or_default();
        debug!(method, path, query = query.len(), "datastore access");

        match method {
            "GET" | "HEAD" => match store.get(path) {
                Some(document) => {
                    // the framer derives Content-Length from the body, so HEAD answers with `0`
                    let body = if method == "HEAD" { Bytes::new() } else { document.clone() };
                    Self::json(stream, StatusCode::OK, &body)
                }
                None => {
                    let error = ErrorDescriptor::new(ErrorType::Application, ErrorTag::InvalidValue, "Data node not found")
                        .with_status(StatusCode::NOT_FOUND);
                    self.fail(params, &error, stream)
                }
            },
            "PUT" | "POST" => {
                let created = store.insert(path.to_owned(), stream.inbound().clone()).is_none();
                stream.reply(if created { StatusCode::CREATED } else { StatusCode::NO_CONTENT }, b"");
                Ok(())
            }
            "DELETE" => {
                store.remove(path);
                stream.reply(StatusCode::NO_CONTENT, b"");
                Ok(())
            }
            _ => {
                let error = ErrorDescriptor::new(ErrorType::Protocol, ErrorTag::OperationNotSupported, "Method not allowed");
                self.fail(params, &error, stream)
            }
        }
    }
}

impl fmt::Debug for DemoRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemoRouter").field("pretty", &self.pretty).finish_non_exhaustive()
    }
}

impl ResourceRouter for DemoRouter {
    fn handle_root(&self, params: &CanonicalParams, query: &QueryVector, stream: &mut StreamState) -> Result<(), BridgeError> {
        let path = params.uri().unwrap_or_default();
        let Ok(matched) = self.resources.at(path) else {
            let error = ErrorDescriptor::invalid_value("Invalid resource path").with_status(StatusCode::NOT_FOUND);
            return self.fail(params, &error, stream);
        };

        match matched.value {
            Resource::Root => Self::json(stream, StatusCode::OK, ROOT_DOCUMENT.as_bytes()),
            Resource::Datastore => {
                let store = self.store.lock().map_err(|e| BridgeError::internal(format!("datastore poisoned: {e}")))?;
                let keys: Vec<&str> = store.keys().map(String::as_str).collect();
                let body = serde_json::to_vec(&serde_json::json!({ "ietf-restconf:data": keys }))
                    .map_err(|e| BridgeError::internal(format!("serialize datastore index: {e}")))?;
                Self::json(stream, StatusCode::OK, &body)
            }
            Resource::Node => {
                let node = matched.params.get("path").unwrap_or_default().to_owned();
                self.node(params, &node, query, stream)
            }
        }
    }

    fn handle_well_known(&self, params: &CanonicalParams, stream: &mut StreamState) -> Result<(), BridgeError> {
        match self.well_known.at(params.uri().unwrap_or_default()).map(|matched| *matched.value) {
            Ok(WellKnown::HostMeta) => {
                stream.add_header("Content-Type", "application/xrd+xml")?;
                stream.reply(StatusCode::OK, HOST_META.as_bytes());
                Ok(())
            }
            Err(e) => {
                error!(cause = %e, "unknown well-known resource");
                stream.reply(StatusCode::NOT_FOUND, b"");
                Ok(())
            }
        }
    }
}
