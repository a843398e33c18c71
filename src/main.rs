//! reach-rpc - post wire literals to an RPC endpoint.
//!
//! Usage: `reach-rpc <path> [literal ...]`
//!
//! The endpoint is read from the `REACH_RPC_*` environment variables and the
//! raw reply is written to stdout.

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reach_rpc::{ReachRpc, RpcOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "reach_rpc=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: reach-rpc <path> [literal ...]");
    };
    let literals: Vec<String> = args.collect();

    let options = RpcOptions::from_env().context("Failed to read endpoint configuration")?;
    tracing::info!(
        "reach-rpc v{} -> {}:{}",
        env!("CARGO_PKG_VERSION"),
        options.host,
        options.port
    );

    let rpc = ReachRpc::new(options).context("Failed to create RPC client")?;
    let reply = rpc
        .call(&path, &literals)
        .await
        .with_context(|| format!("Call to {} failed", path))?;

    println!("{}", reply);
    Ok(())
}
