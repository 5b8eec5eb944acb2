//! # Chaincode Runtime Binary
//!
//! Hosts the counter chaincode over an in-memory ledger and serves JSON-line
//! invocations on stdin/stdout. Logs go to stderr.

use anyhow::{Context, Result};
use chaincode_runtime::{load_config, ChaincodeRuntime};
use tokio::io::{self, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = load_config().context("failed to load runtime configuration")?;
    info!(
        chaincode_id = %config.chaincode.chaincode_id,
        channel = %config.channel_id,
        page_size = config.ledger.page_size,
        "Starting chaincode runtime"
    );

    let runtime = ChaincodeRuntime::new(config).context("failed to build chaincode")?;
    let event_logger = runtime.spawn_event_logger();

    let init = runtime.init().await;
    if !init.is_success() {
        anyhow::bail!("chaincode init failed: {}", init.message);
    }

    runtime
        .serve(BufReader::new(io::stdin()), io::stdout())
        .await
        .context("invocation loop failed")?;

    let stats = runtime.host().chaincode().stats().await;
    info!(
        invocations = stats.invocations,
        successes = stats.successes,
        not_found = stats.not_found,
        unauthorized = stats.unauthorized,
        failed = stats.failed,
        "Shutting down"
    );

    // Dropping the ledger closes the event stream; the logger drains and exits.
    drop(runtime);
    if let Err(e) = event_logger.await {
        warn!(error = %e, "Event logger terminated abnormally");
    }

    Ok(())
}
