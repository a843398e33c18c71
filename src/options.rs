//! Endpoint configuration.
//!
//! [`RpcOptions`] is built once and shared by reference between the
//! transport, the continuation engine and every value received from the
//! server. It can be assembled in code or read from the `REACH_RPC_*`
//! environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

pub const ENV_SERVER: &str = "REACH_RPC_SERVER";
pub const ENV_PORT: &str = "REACH_RPC_PORT";
pub const ENV_KEY: &str = "REACH_RPC_KEY";
pub const ENV_TIMEOUT: &str = "REACH_RPC_TIMEOUT";
pub const ENV_TLS_REJECT_UNVERIFIED: &str = "REACH_RPC_TLS_REJECT_UNVERIFIED";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("Invalid endpoint origin: {0}")]
    Origin(#[source] url::ParseError),
}

/// Where and how to reach the RPC server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcOptions {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Value sent in the `X-API-Key` header.
    pub key: String,
    /// Per-request timeout.
    #[serde(with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
    /// Whether to validate the server certificate.
    #[serde(default)]
    pub verify: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}

impl RpcOptions {
    /// Options with the default timeout and certificate checks disabled.
    pub fn new(host: impl Into<String>, port: u16, key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            key: key.into(),
            timeout: default_timeout(),
            verify: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Read options from the environment.
    ///
    /// `REACH_RPC_SERVER`, `REACH_RPC_PORT` and `REACH_RPC_KEY` are
    /// required. `REACH_RPC_TIMEOUT` (seconds) defaults to 5 and
    /// `REACH_RPC_TLS_REJECT_UNVERIFIED` defaults to `0`, which skips
    /// certificate validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let host = required(ENV_SERVER)?;
        let port_raw = required(ENV_PORT)?;
        let port = port_raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name: ENV_PORT,
            value: port_raw.clone(),
        })?;
        let key = required(ENV_KEY)?;

        let timeout = match lookup(ENV_TIMEOUT) {
            Some(raw) => Duration::from_secs(raw.trim().parse().map_err(|_| {
                ConfigError::Invalid {
                    name: ENV_TIMEOUT,
                    value: raw.clone(),
                }
            })?),
            None => default_timeout(),
        };

        let verify = match lookup(ENV_TLS_REJECT_UNVERIFIED).as_deref().map(str::trim) {
            None | Some("0") => false,
            Some("1") => true,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: ENV_TLS_REJECT_UNVERIFIED,
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            host,
            port,
            key,
            timeout,
            verify,
        })
    }

    /// `https://host:port`, the base every request path is appended to.
    pub fn origin(&self) -> Result<Url, ConfigError> {
        Url::parse(&format!("https://{}:{}", self.host, self.port)).map_err(ConfigError::Origin)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
