use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{BytesCodec, Encoder, FramedRead, FramedWrite};
use tracing::{error, info};

use crate::adapter::{Bridge, ConnectionContext, ErrorResponder, Exchange};
use crate::codec::{ReplyEncoder, RequestDecoder};
use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::handler::ResourceRouter;
use crate::protocol::{CanonicalParams, HttpError, ParseError, ProtocolVersion, Reply, SendError};

const READ_BUFFER_SIZE: usize = 8 * 1024;

/// Drives one HTTP/1.x connection through a [`Bridge`].
///
/// Requests are decoded completely (head and `Content-Length` body) before
/// the bridge sees them and are served strictly one after the other, so
/// pipelined requests are answered in order.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, BytesCodec>,
    context: ConnectionContext,
}

/// How [`HttpConnection::process`] ended without error.
#[derive(Debug)]
pub enum Processed<R, W> {
    /// The peer went away or the connection was closed after a reply.
    Closed,
    /// A `101 Switching Protocols` was written; the transport is handed back.
    Upgraded(UpgradeHandoff<R, W>),
}

/// Everything the upgraded protocol needs to continue the connection.
#[derive(Debug)]
pub struct UpgradeHandoff<R, W> {
    pub reader: R,
    pub writer: W,
    /// Bytes already read past the upgrade request.
    pub read_buf: BytesMut,
    /// Parameters of the upgrade request, kept alive for the new transport.
    pub params: CanonicalParams,
    /// `HTTP2-Settings` payload of the upgrade request.
    pub settings: Option<Bytes>,
    pub context: ConnectionContext,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_context(reader, writer, ConnectionContext::new())
    }

    /// A connection with a prepared context, typically one carrying the TLS
    /// session of the handshake.
    pub fn with_context(reader: R, writer: W, context: ConnectionContext) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(DEFAULT_MAX_BODY_BYTES), READ_BUFFER_SIZE),
            framed_write: FramedWrite::new(writer, BytesCodec::new()),
            context,
        }
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    pub async fn process<Rt, E>(mut self, bridge: Arc<Bridge<Rt, E>>) -> Result<Processed<R, W>, HttpError>
    where
        Rt: ResourceRouter,
        E: ErrorResponder,
    {
        *self.framed_read.decoder_mut() = RequestDecoder::new(bridge.config().max_body_bytes);
        let conn = self.context.id();

        loop {
            match self.framed_read.next().await {
                Some(Ok(request)) => {
                    let exchange = bridge.handle(&mut self.context, &request);
                    if let Some(reply) = &exchange.reply {
                        self.framed_write.send(reply.clone()).await.map_err(SendError::io)?;
                    }

                    if exchange.is_upgraded() {
                        info!(%conn, "connection switched protocols");
                        return Ok(Processed::Upgraded(self.into_handoff(exchange)));
                    }
                    if exchange.close || self.context.should_exit() {
                        info!(%conn, "closing connection after reply");
                        return Ok(Processed::Closed);
                    }
                }

                Some(Err(e)) => {
                    error!(%conn, cause = %e, "can't receive next request");
                    self.send_bare(&e).await?;
                    return Err(e.into());
                }

                None => {
                    info!(%conn, "cant read more request, break this connection down");
                    return Ok(Processed::Closed);
                }
            }
        }
    }

    /// Answers a request the engine could not decode; the connection is closed
    /// afterwards, so the reply says so.
    async fn send_bare(&mut self, e: &ParseError) -> Result<(), HttpError> {
        if matches!(e, ParseError::Io { .. }) {
            return Ok(());
        }
        let reply = Reply::bare(ProtocolVersion::Http11, false, e.status_code());
        let mut dst = BytesMut::new();
        ReplyEncoder::new().encode(reply, &mut dst)?;
        self.framed_write.send(dst.freeze()).await.map_err(SendError::io)?;
        Ok(())
    }

    fn into_handoff(mut self, exchange: Exchange) -> UpgradeHandoff<R, W> {
        let read_buf = self.framed_read.read_buffer_mut().split();
        UpgradeHandoff {
            reader: self.framed_read.into_inner(),
            writer: self.framed_write.into_inner(),
            read_buf,
            params: exchange.params.into_retained().unwrap_or_default(),
            settings: exchange.settings,
            context: self.context,
        }
    }
}

impl<R, W> std::fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConnection").field("context", &self.context).finish_non_exhaustive()
    }
}
