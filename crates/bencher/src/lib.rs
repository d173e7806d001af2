//! Shared fixtures for the micro-bridge benchmarks.

use micro_bridge::protocol::{BridgeError, CanonicalParams, QueryVector, StreamState};

/// A raw request kept next to the benches under `resources/request`.
#[derive(Debug, Copy, Clone)]
pub struct RequestFixture {
    name: &'static str,
    size: FixtureSize,
    raw: &'static str,
}

impl RequestFixture {
    pub const fn new(name: &'static str, size: FixtureSize, raw: &'static str) -> Self {
        Self { name, size, raw }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn size(&self) -> FixtureSize {
        self.size
    }

    pub fn raw(&self) -> &'static str {
        self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixtureSize {
    Small,
    Large,
}

pub static GET_SMALL: RequestFixture =
    RequestFixture::new("get_small", FixtureSize::Small, include_str!("../resources/request/get_small.txt"));
pub static GET_LARGE: RequestFixture =
    RequestFixture::new("get_large", FixtureSize::Large, include_str!("../resources/request/get_large.txt"));
pub static PUT_JSON: RequestFixture =
    RequestFixture::new("put_json", FixtureSize::Small, include_str!("../resources/request/put_json.txt"));

pub fn fixtures() -> [RequestFixture; 3] {
    [GET_SMALL, GET_LARGE, PUT_JSON]
}

/// Router doing the least a real one would: read two parameters, write a body.
pub fn echo_route(params: &CanonicalParams, query: &QueryVector, stream: &mut StreamState) -> Result<(), BridgeError> {
    stream.add_header("Content-Type", "application/yang-data+json")?;
    let body = format!(
        r#"{{"method":"{}","uri":"{}","query":{}}}"#,
        params.method().unwrap_or_default(),
        params.uri().unwrap_or_default(),
        query.len()
    );
    stream.reply(http::StatusCode::OK, body.as_bytes());
    Ok(())
}
