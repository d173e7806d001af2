use bytes::BytesMut;
use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use http::StatusCode;
use micro_bridge::codec::{ReplyEncoder, RequestDecoder};
use micro_bridge::connection::HttpConnection;
use micro_bridge::handler::router_fn;
use micro_bridge::protocol::{ProtocolVersion, Reply};
use micro_bridge::{Bridge, BridgeConfig, ConnectionContext};
use std::hint::black_box;
use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_util::codec::{Decoder, Encoder};

const GET_REQUEST: &str = "GET /restconf/data/ietf-interfaces:interfaces?depth=2&content=config HTTP/1.1\r\n\
    Host: localhost\r\n\
    Accept: application/yang-data+json\r\n\
    User-Agent: bench\r\n\r\n";

// Mock IO for testing
#[derive(Clone)]
struct MockIO {
    read_data: Vec<u8>,
    write_data: Vec<u8>,
    read_pos: usize,
}

impl MockIO {
    fn new(read_data: Vec<u8>) -> Self {
        Self { read_data, write_data: Vec::new(), read_pos: 0 }
    }
}

impl AsyncRead for MockIO {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let remaining = &self.read_data[self.read_pos..];
        let amt = std::cmp::min(remaining.len(), buf.remaining());
        buf.put_slice(&remaining[..amt]);
        self.read_pos += amt;
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockIO {
    fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
        self.write_data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Poll::Ready(Ok(()))
    }
}

fn bench_bridge() -> Bridge<impl micro_bridge::handler::ResourceRouter> {
    Bridge::new(
        BridgeConfig::default(),
        router_fn(|params, query, stream| {
            let body = format!(r#"{{"uri":"{}","query":{}}}"#, params.uri().unwrap_or_default(), query.len());
            stream.add_header("Content-Type", "application/yang-data+json")?;
            stream.reply(StatusCode::OK, body.as_bytes());
            Ok(())
        }),
    )
}

fn bench_request_decoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_decoder");

    group.bench_function("decode_get", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new(1024 * 1024);
            let mut bytes = BytesMut::from(GET_REQUEST);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });

    group.finish();
}

fn bench_reply_encoder(c: &mut Criterion) {
    let mut group = c.benchmark_group("reply_encoder");

    group.bench_function("encode_json_reply", |b| {
        b.iter(|| {
            let mut encoder = ReplyEncoder::new();
            let mut reply = Reply::bare(ProtocolVersion::Http11, true, StatusCode::OK);
            reply.headers.append("Content-Type", "application/yang-data+json").unwrap();
            reply.body = bytes::Bytes::from_static(br#"{"ietf-interfaces:interfaces":{}}"#);
            let mut bytes = BytesMut::with_capacity(1024);
            encoder.encode(reply, &mut bytes).unwrap();
            black_box(bytes);
        });
    });

    group.finish();
}

fn bench_bridge_handle(c: &mut Criterion) {
    let mut group = c.benchmark_group("bridge");
    let bridge = bench_bridge();
    let request = RequestDecoder::new(1024).decode(&mut BytesMut::from(GET_REQUEST)).unwrap().unwrap();

    group.bench_function("handle_get", |b| {
        let mut ctx = ConnectionContext::new();
        b.iter(|| black_box(bridge.handle(&mut ctx, &request)));
    });

    group.finish();
}

fn bench_http_connection(c: &mut Criterion) {
    let mut group = c.benchmark_group("http_connection");
    let bridge = Arc::new(bench_bridge());

    group.bench_function("process_get", |b| {
        b.iter(|| {
            let reader = MockIO::new(GET_REQUEST.as_bytes().to_vec());
            let writer = MockIO::new(Vec::new());
            let connection = HttpConnection::new(reader, writer);
            black_box(block_on(connection.process(bridge.clone())).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_request_decoder, bench_reply_encoder, bench_bridge_handle, bench_http_connection);
criterion_main!(benches);
