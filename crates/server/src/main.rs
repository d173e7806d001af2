//! Demo server hosting the bridge in front of an in-memory datastore.
//!
//! ```text
//! micro-bridge-server [config.json]
//! ```

mod config;
mod router;

use std::sync::Arc;

use micro_bridge::Bridge;
use micro_bridge::connection::{HttpConnection, Processed};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::{ConfigError, ServerConfig};
use crate::router::DemoRouter;

#[derive(Error, Debug)]
enum ServerError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("route table error: {0}")]
    Route(#[from] matchit::InsertError),

    #[error("can't install log subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),

    #[error("bind {address} error: {source}")]
    Bind { address: String, source: std::io::Error },
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    let subscriber = FmtSubscriber::builder().with_max_level(config.max_level()?).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let router = DemoRouter::new(config.bridge.pretty)?;
    let bridge = Arc::new(Bridge::new(config.bridge.clone(), router));

    info!(address = %config.address, h2c = bridge.config().h2c_upgrade, "start listening");
    let tcp_listener = TcpListener::bind(config.address.as_str())
        .await
        .map_err(|source| ServerError::Bind { address: config.address.clone(), source })?;

    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let bridge = bridge.clone();
        tokio::spawn(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::new(reader, writer);
            let conn = connection.context().id();
            info!(%conn, %remote_addr, "accepted connection");

            match connection.process(bridge).await {
                Ok(Processed::Closed) => {
                    info!(%conn, "finished process, connection shutdown");
                }
                Ok(Processed::Upgraded(handoff)) => {
                    // no HTTP/2 stack here, the handshake is all this server does
                    info!(
                        %conn,
                        params = handoff.params.len(),
                        settings = handoff.settings.is_some(),
                        buffered = handoff.read_buf.len(),
                        "connection upgraded to h2c, dropping it"
                    );
                }
                Err(e) => {
                    error!(%conn, cause = %e, "service has error, connection shutdown");
                }
            }
        });
    }
}
