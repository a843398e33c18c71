//! Continuation contracts.
//!
//! A contract call does not return a single answer. The server replies with
//! a contract id (`kid`), a status token (`t`) and, while the status is
//! `Kont`, the name of a client-side function to run (`m`) plus its
//! arguments. The client runs the function, posts the result to `/kont`, and
//! repeats until the status is anything other than `Kont`.
//!
//! ```text
//!  client                                   server
//!    │ POST path [contract, {vals}, {cbs}]    │
//!    │───────────────────────────────────────►│
//!    │      {"t":"Kont","kid":..,"m":"f",     │
//!    │       "args":[..]}                     │
//!    │◄───────────────────────────────────────│
//!    │  run f(args)                           │
//!    │ POST /kont ["kid", result]             │
//!    │───────────────────────────────────────►│
//!    │      {"t":"Kont",..} or {"t":"Done"}   │
//!    │◄───────────────────────────────────────│
//! ```
//!
//! Everything is sequential: one request in flight and one handler running
//! at a time. There is no cancellation and nothing is retried.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;

use crate::client::ReachRpc;
use crate::transport::TransportError;
use crate::value::MultiTyped;
use crate::wire::{self, KontReply, RpcValue};

/// Path the result of every dispatched callback is posted to.
pub const KONT_PATH: &str = "/kont";

/// What a callback hands back: a wire literal, or `None` for `null`.
pub type HandlerResult = anyhow::Result<Option<String>>;

type SyncHandler = dyn Fn(Vec<MultiTyped>) -> HandlerResult + Send + Sync;
type AsyncHandler = dyn Fn(Vec<MultiTyped>) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Errors that end a contract.
#[derive(Debug, Error)]
pub enum KontError {
    /// The server dispatched a function that was never registered.
    #[error("There is no function named {0}")]
    UnknownCallback(String),

    /// The status was `Kont` but the reply named no function.
    #[error("Reply continues the contract but names no function")]
    MissingDispatch,

    /// A registered callback returned an error.
    #[error("Callback {name} failed: {source}")]
    HandlerFailure {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// A registered callback panicked.
    #[error("Callback {name} panicked: {message}")]
    HandlerPanic { name: String, message: String },

    /// The reply could not be read.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// The status token of a contract.
///
/// Only `Kont` is meaningful to the engine; every other token is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KontStatus {
    Kont,
    Done,
    Fail,
    /// Any other terminal token, kept verbatim.
    Other(String),
}

impl KontStatus {
    pub fn is_kont(&self) -> bool {
        matches!(self, KontStatus::Kont)
    }

    pub fn as_str(&self) -> &str {
        match self {
            KontStatus::Kont => "Kont",
            KontStatus::Done => "Done",
            KontStatus::Fail => "Fail",
            KontStatus::Other(token) => token,
        }
    }
}

impl From<&str> for KontStatus {
    fn from(token: &str) -> Self {
        match token {
            "Kont" => KontStatus::Kont,
            "Done" => KontStatus::Done,
            "Fail" => KontStatus::Fail,
            other => KontStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for KontStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A callback body, either plain or suspending.
enum Handler {
    Sync(Box<SyncHandler>),
    Async(Box<AsyncHandler>),
}

/// A named function the server may ask the client to run.
pub struct RpcCallback {
    name: String,
    handler: Handler,
}

impl RpcCallback {
    /// Register a callback that returns immediately.
    ///
    /// ```
    /// use reach_rpc::RpcCallback;
    ///
    /// let cb = RpcCallback::sync("getHand", |_args| Ok(Some("1".to_string())));
    /// assert_eq!(cb.name(), "getHand");
    /// ```
    pub fn sync<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<MultiTyped>) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Handler::Sync(Box::new(handler)),
        }
    }

    /// Register a callback that may suspend before producing its result.
    pub fn asynchronous<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Vec<MultiTyped>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            handler: Handler::Async(Box::new(move |args| handler(args).boxed())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_async(&self) -> bool {
        matches!(self.handler, Handler::Async(_))
    }

    /// Run the callback, awaiting it if it suspends.
    ///
    /// An error returned by the handler becomes `HandlerFailure`; a panic,
    /// whether raised while building or polling an async handler's future,
    /// is caught and becomes `HandlerPanic`.
    pub async fn invoke(&self, args: Vec<MultiTyped>) -> Result<Option<String>, KontError> {
        let outcome = match &self.handler {
            Handler::Sync(f) => catch_unwind(AssertUnwindSafe(|| f(args))),
            Handler::Async(f) => match catch_unwind(AssertUnwindSafe(|| f(args))) {
                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                Err(payload) => Err(payload),
            },
        };

        match outcome {
            Ok(result) => result.map_err(|source| KontError::HandlerFailure {
                name: self.name.clone(),
                source,
            }),
            Err(payload) => Err(KontError::HandlerPanic {
                name: self.name.clone(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for RpcCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcCallback")
            .field("name", &self.name)
            .field("async", &self.is_async())
            .finish()
    }
}

/// How a contract ended.
#[derive(Debug)]
pub struct KontOutcome {
    /// Contract id assigned by the server.
    pub contract_id: String,
    /// Terminal status token. Never `Kont`.
    pub status: KontStatus,
    /// Callbacks run and posted back successfully.
    pub rounds: usize,
    /// The error that forced `Fail`, if the client ended the contract.
    pub failure: Option<KontError>,
}

impl KontOutcome {
    pub fn is_failed(&self) -> bool {
        self.status == KontStatus::Fail
    }
}

/// Drive one contract to completion.
///
/// Errors from the opening call propagate. Once the contract id is known,
/// any error ends the contract with status `Fail` and is returned in
/// [`KontOutcome::failure`] instead.
pub async fn run(
    client: &ReachRpc,
    path: &str,
    contract: &str,
    values: &[RpcValue],
    callbacks: &[RpcCallback],
) -> Result<KontOutcome, KontError> {
    let body = wire::contract_body(contract, values, callbacks);
    let mut text = client.call(path, &[body]).await?;
    let mut reply = KontReply::decode(&text)?;

    let contract_id = reply
        .kid
        .clone()
        .ok_or_else(|| KontError::MalformedReply("reply has no contract id".to_string()))?;
    let mut status = status_of(&reply)?;
    tracing::debug!(contract = %contract_id, %status, "Contract opened");

    let mut rounds = 0;
    let mut failure = None;

    while status.is_kont() {
        match dispatch(client, &contract_id, callbacks, &reply, &text).await {
            Ok((next_text, next_reply, next_status)) => {
                rounds += 1;
                text = next_text;
                reply = next_reply;
                status = next_status;
                tracing::debug!(contract = %contract_id, %status, "Continuation reply");
            }
            Err(err) => {
                tracing::error!(contract = %contract_id, error = %err, "Contract failed");
                status = KontStatus::Fail;
                failure = Some(err);
            }
        }
    }

    tracing::info!(contract = %contract_id, %status, rounds, "Contract finished");

    Ok(KontOutcome {
        contract_id,
        status,
        rounds,
        failure,
    })
}

/// One round: run the dispatched callback, post its result, read the reply.
async fn dispatch(
    client: &ReachRpc,
    contract_id: &str,
    callbacks: &[RpcCallback],
    reply: &KontReply,
    text: &str,
) -> Result<(String, KontReply, KontStatus), KontError> {
    let name = reply.m.as_deref().ok_or(KontError::MissingDispatch)?;
    let callback = callbacks
        .iter()
        .find(|cb| cb.name == name)
        .ok_or_else(|| KontError::UnknownCallback(name.to_string()))?;

    let args: Vec<MultiTyped> = wire::extract_args(text)?
        .into_iter()
        .map(|raw| MultiTyped::new(raw, client.clone()))
        .collect();
    tracing::debug!(function = name, args = args.len(), "Dispatching callback");

    let result = callback.invoke(args).await?;

    let next_text = client
        .call(KONT_PATH, &wire::kont_args(contract_id, result.as_deref()))
        .await?;
    let next_reply = KontReply::decode(&next_text)?;
    let next_status = status_of(&next_reply)?;

    Ok((next_text, next_reply, next_status))
}

fn status_of(reply: &KontReply) -> Result<KontStatus, KontError> {
    reply
        .t
        .as_deref()
        .map(KontStatus::from)
        .ok_or_else(|| KontError::MalformedReply("reply has no status token".to_string()))
}
