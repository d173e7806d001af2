//! Adapter configuration.
//!
//! Built in code through [`BridgeConfig::builder`], or deserialized from a
//! configuration file; missing fields take their defaults.

use serde::Deserialize;

const DEFAULT_WELL_KNOWN_PREFIX: &str = "/.well-known/";
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Accept `Upgrade: h2c` requests and switch protocols.
    pub h2c_upgrade: bool,
    /// Pretty-print structured error documents.
    pub pretty: bool,
    /// Answer HTTP/1.1 clients asking to close with `Connection: keep-alive`,
    /// as older deployments did, instead of `Connection: close`.
    pub legacy_keep_alive_echo: bool,
    /// Refuse TLS sessions whose client certificate did not verify.
    pub verify_client_certs: bool,
    /// Paths below this prefix go to the well-known entry point of the router.
    pub well_known_prefix: String,
    /// Largest request body the engine buffers before handing a request over.
    pub max_body_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            h2c_upgrade: false,
            pretty: false,
            legacy_keep_alive_echo: false,
            verify_client_certs: false,
            well_known_prefix: DEFAULT_WELL_KNOWN_PREFIX.to_owned(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl BridgeConfig {
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder { config: BridgeConfig::default() }
    }

    /// Whether `path` belongs to the well-known entry point.
    pub fn is_well_known(&self, path: &str) -> bool {
        path.starts_with(&self.well_known_prefix)
    }
}

#[derive(Debug)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn h2c_upgrade(mut self, enabled: bool) -> Self {
        self.config.h2c_upgrade = enabled;
        self
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.config.pretty = pretty;
        self
    }

    pub fn legacy_keep_alive_echo(mut self, enabled: bool) -> Self {
        self.config.legacy_keep_alive_echo = enabled;
        self
    }

    pub fn verify_client_certs(mut self, enabled: bool) -> Self {
        self.config.verify_client_certs = enabled;
        self
    }

    pub fn well_known_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.well_known_prefix = prefix.into();
        self
    }

    pub fn max_body_bytes(mut self, max: usize) -> Self {
        self.config.max_body_bytes = max;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BridgeConfig::default();
        assert!(!config.h2c_upgrade);
        assert!(!config.legacy_keep_alive_echo);
        assert!(config.is_well_known("/.well-known/host-meta"));
        assert!(!config.is_well_known("/restconf/data"));
    }

    #[test]
    fn builder_overrides() {
        let config = BridgeConfig::builder().h2c_upgrade(true).pretty(true).max_body_bytes(16).build();
        assert!(config.h2c_upgrade);
        assert!(config.pretty);
        assert_eq!(config.max_body_bytes, 16);
    }

    #[test]
    fn deserialize_partial_json() {
        let config: BridgeConfig = serde_json::from_str(r#"{"h2c_upgrade": true, "well_known_prefix": "/wk/"}"#).unwrap();
        assert!(config.h2c_upgrade);
        assert!(config.is_well_known("/wk/host-meta"));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);

        assert!(serde_json::from_str::<BridgeConfig>(r#"{"h2c": true}"#).is_err());
    }
}
