//! A transport normalization adapter for HTTP/1.x RESTCONF servers
//!
//! This crate sits between an HTTP/1.0/1.1 server engine and a protocol
//! agnostic request processing core. Inbound, it turns a raw request into a
//! canonical parameter set (`REQUEST_METHOD`, `REQUEST_URI`, `HTTPS`, `SSL_CN`,
//! `HTTP_<NAME>`) plus an ordered, percent-decoded query vector. Outbound, it
//! frames whatever the core produced into a byte-correct HTTP/1.x reply,
//! negotiating keep-alive and optionally a clear-text `h2c` upgrade.
//!
//! # Features
//!
//! - Canonical parameters owned per request, never shared between connections
//! - Strict percent-decoding of query values, duplicates kept in order
//! - TLS subject attributes (`HTTPS`, `SSL_CN`) from the negotiated session
//! - `h2c` upgrade handshake with the parameters retained for the new transport
//! - Structured RESTCONF client errors in JSON or XML
//! - A `500` fallback carrying the last recorded diagnostic
//! - A tokio connection driver to host the adapter end to end
//!
//! # Example
//!
//! ```no_run
//! use http::StatusCode;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use micro_bridge::connection::HttpConnection;
//! use micro_bridge::handler::router_fn;
//! use micro_bridge::{Bridge, BridgeConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     let router = router_fn(|params, query, stream| {
//!         let body = format!("{} {} ({} query pairs)",
//!             params.method().unwrap_or("-"), params.uri().unwrap_or("-"), query.len());
//!         stream.add_header("Content-Type", "text/plain")?;
//!         stream.reply(StatusCode::OK, body.as_bytes());
//!         Ok(())
//!     });
//!     let bridge = Arc::new(Bridge::new(BridgeConfig::builder().h2c_upgrade(true).build(), router));
//!
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let bridge = bridge.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             match HttpConnection::new(reader, writer).process(bridge).await {
//!                 Ok(_) => info!("finished process, connection shutdown"),
//!                 Err(e) => error!(cause = %e, "service has error, connection shutdown"),
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: the data model, inbound request, canonical parameters, stream state and errors
//! - [`adapter`]: translation, upgrade negotiation, structured errors, fallback and the [`Bridge`]
//! - [`codec`]: the reply framer and the engine's request decoder
//! - [`handler`]: the [`ResourceRouter`](handler::ResourceRouter) seam
//! - [`connection`]: the per-connection driver
//!
//! # Request Flow
//!
//! 1. the engine decodes a complete request and calls [`Bridge::handle`]
//! 2. the stream state is reset and the inbound body captured
//! 3. the translator fills the parameter set and the query vector
//! 4. sessions with an unverified client certificate are refused when
//!    [`BridgeConfig::verify_client_certs`] is set
//! 5. the upgrade negotiator may answer with `101` or a client error
//! 6. otherwise the router runs, the root entry point or the well-known one
//! 7. the parameter set is cleared, unless an upgrade retains it
//! 8. the reply framer serializes the reply, if a status was produced
//!
//! Any unrecoverable failure along the way ends in the error fallback.
//!
//! # Error Handling
//!
//! - [`protocol::BridgeError`]: translation and framing; client errors are answered
//!   in place, the rest escalate to the fallback
//! - [`protocol::ParseError`]: requests the engine cannot decode
//! - [`protocol::SendError`]: reply encoding and writing
//! - [`protocol::HttpError`]: top-level connection error
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only; the upgraded protocol itself is not spoken
//! - No TLS; the session outcome is supplied by whoever terminated it
//! - Chunked request bodies are refused
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod adapter;
pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod config;
pub use config::BridgeConfig;
pub use config::BridgeConfigBuilder;

pub use adapter::Bridge;
pub use adapter::ConnectionContext;
pub use adapter::Exchange;

mod utils;
pub(crate) use utils::ensure;
