//! Reach RPC client library.
//!
//! This library provides the client side of an HTTP RPC protocol in which
//! some calls are continuations: the server keeps asking the client to run
//! named local functions until the call terminates.
//!
//! - `client` - `ReachRpc`, the entry point for plain calls and contracts
//! - `kont` - the continuation engine and callback registration
//! - `value` - `MultiTyped`, lazily coerced wire values
//! - `tokenizer` - depth-aware splitting of bracketed literals
//! - `wire` - body serialization and reply decoding
//! - `transport` - the HTTP transport and its trait
//! - `options` - endpoint configuration
//!
//! # Example
//!
//! ```ignore
//! use reach_rpc::{ReachRpc, RpcCallback, RpcOptions, RpcValue};
//!
//! let rpc = ReachRpc::new(RpcOptions::from_env()?)?;
//! let outcome = rpc
//!     .callbacks(
//!         "/backend/Alice",
//!         &contract,
//!         &[RpcValue::new("wager", "5")],
//!         &[RpcCallback::sync("getHand", |_| Ok(Some("1".into())))],
//!     )
//!     .await?;
//! println!("contract {} ended with {}", outcome.contract_id, outcome.status);
//! ```

pub mod client;
pub mod kont;
pub mod options;
pub mod tokenizer;
pub mod transport;
pub mod value;
pub mod wire;

pub use client::{ReachRpc, RpcError};
pub use kont::{HandlerResult, KontError, KontOutcome, KontStatus, RpcCallback, KONT_PATH};
pub use options::{ConfigError, RpcOptions};
pub use transport::{HttpTransport, Transport, TransportError};
pub use value::{MultiTyped, ParseError};
pub use wire::RpcValue;
