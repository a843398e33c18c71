//! RPC client for the Reach-style HTTP RPC server.
//!
//! This module provides `ReachRpc`, an async client that POSTs
//! bracket-wrapped argument lists to the server and runs continuation
//! contracts on top of that.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::kont::{self, KontError, KontOutcome, RpcCallback};
use crate::options::RpcOptions;
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::value::MultiTyped;
use crate::wire::{stringify_args, RpcValue};

/// Errors from calls whose reply is decoded.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The reply was not the JSON the caller expected.
    #[error("Failed to decode reply {body:?}: {source}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Client for one RPC endpoint.
///
/// Cheap to clone: the options and the transport are shared. Every value
/// received from the server holds a clone, so remote-backed coercions go to
/// the same endpoint with the same configuration.
///
/// # Example
///
/// ```ignore
/// use reach_rpc::{ReachRpc, RpcOptions};
///
/// let rpc = ReachRpc::new(RpcOptions::new("127.0.0.1", 3000, "secret"))?;
///
/// // Arguments are wire literals.
/// let raw = rpc.call("/stdlib/parseCurrency", &["\"1.5\""]).await?;
/// ```
#[derive(Clone)]
pub struct ReachRpc {
    options: Arc<RpcOptions>,
    transport: Arc<dyn Transport>,
}

impl ReachRpc {
    /// Create a client that talks HTTPS to the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the origin or the API key is invalid, or
    /// if the HTTP client cannot be built.
    pub fn new(options: RpcOptions) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(&options)?;
        Ok(Self::with_transport(options, Arc::new(transport)))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(options: RpcOptions, transport: Arc<dyn Transport>) -> Self {
        Self {
            options: Arc::new(options),
            transport,
        }
    }

    pub fn options(&self) -> &Arc<RpcOptions> {
        &self.options
    }

    /// Wrap a raw literal as a value bound to this client.
    pub fn value(&self, raw: impl Into<String>) -> MultiTyped {
        MultiTyped::new(raw, self.clone())
    }

    /// POST `[a1, a2, ...]` to `path` and return the raw reply.
    ///
    /// Each argument must already be a wire literal. A body of two
    /// characters or fewer (`[]`) is not sent.
    pub async fn call<S: AsRef<str>>(&self, path: &str, args: &[S]) -> Result<String, TransportError> {
        let body = stringify_args(args);
        let body = (body.len() > 2).then_some(body);
        self.transport.post(path, body).await
    }

    /// Like [`call`](Self::call), decoding the reply as a JSON string.
    pub async fn call_string<S: AsRef<str>>(&self, path: &str, args: &[S]) -> Result<String, RpcError> {
        let body = self.call(path, args).await?;
        serde_json::from_str(&body).map_err(|source| RpcError::Decode { body, source })
    }

    /// Open a continuation contract at `path` and run it to completion.
    ///
    /// `contract` is sent as-is ahead of the named values. The callbacks are
    /// advertised by name and run whenever the server dispatches one.
    ///
    /// # Errors
    ///
    /// Only failures of the opening call are returned as `Err`. Failures
    /// while the contract runs end it with status `Fail`; see
    /// [`KontOutcome::failure`].
    pub async fn callbacks(
        &self,
        path: &str,
        contract: &str,
        values: &[RpcValue],
        callbacks: &[RpcCallback],
    ) -> Result<KontOutcome, KontError> {
        kont::run(self, path, contract, values, callbacks).await
    }
}

impl fmt::Debug for ReachRpc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReachRpc")
            .field("host", &self.options.host)
            .field("port", &self.options.port)
            .finish_non_exhaustive()
    }
}
