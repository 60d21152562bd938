//! # Runtime Configuration Module
//!
//! Two layers of configuration feed the server:
//!
//! - [`HttpConf`] comes from the setup module's `httpConf` field (or is passed
//!   explicitly to [`crate::server::WebApp::start`]) and says where to listen.
//! - [`RuntimeConfig`] comes from environment variables and tunes the `may`
//!   coroutine runtime.
//!
//! ## Environment Variables
//!
//! ### `WEBDISPATCH_STACK_SIZE`
//!
//! Stack size for request coroutines. Accepts decimal (`16384`) or
//! hexadecimal (`0x4000`). Default: `0x10000` (64 KB), since regex compilation and
//! page rendering run on the request coroutine. An `httpConf.stackSize` in the
//! setup module takes precedence.
//!
//! ```bash
//! export WEBDISPATCH_STACK_SIZE=0x8000
//! webdispatch ./app
//! ```

use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Listener settings read from the setup module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpConf {
    /// Interface to bind (default `0.0.0.0`)
    pub host: String,
    /// Port to bind (default `8080`)
    pub port: u16,
    /// Coroutine stack size override in bytes
    pub stack_size: Option<usize>,
}

impl Default for HttpConf {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            stack_size: None,
        }
    }
}

impl HttpConf {
    /// Build from a `host:port` string.
    ///
    /// # Errors
    ///
    /// Fails when there is no `:` or the port is not a number.
    pub fn from_addr(addr: &str) -> anyhow::Result<Self> {
        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("address '{addr}' must be of form host:port"))?;
        let port = port
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid port in '{addr}': {e}"))?;
        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
            stack_size: None,
        })
    }

    /// `host:port` string suitable for socket address resolution.
    #[must_use]
    pub fn addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes (default: 64 KB / 0x10000)
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = env::var("WEBDISPATCH_STACK_SIZE")
            .ok()
            .and_then(|v| parse_stack_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        RuntimeConfig { stack_size }
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal byte count.
#[must_use]
pub fn parse_stack_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size("0x8000"), Some(0x8000));
        assert_eq!(parse_stack_size("16384"), Some(16384));
        assert_eq!(parse_stack_size("lots"), None);
    }

    #[test]
    fn test_http_conf_defaults_and_camel_case() {
        let conf: HttpConf = serde_json::from_str(r#"{"port": 9000, "stackSize": 65536}"#).unwrap();
        assert_eq!(conf.host, "0.0.0.0");
        assert_eq!(conf.port, 9000);
        assert_eq!(conf.stack_size, Some(65536));
        assert_eq!(conf.addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_from_addr() {
        let conf = HttpConf::from_addr("127.0.0.1:3000").unwrap();
        assert_eq!(conf.host, "127.0.0.1");
        assert_eq!(conf.port, 3000);
        let v6 = HttpConf::from_addr("[::1]:3000").unwrap();
        assert_eq!(v6.addr(), "[::1]:3000");
        assert!(HttpConf::from_addr("localhost").is_err());
        assert!(HttpConf::from_addr("localhost:http").is_err());
    }
}
