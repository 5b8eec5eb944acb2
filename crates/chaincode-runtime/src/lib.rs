//! # Chaincode Runtime
//!
//! Development host for the counter chaincode.
//!
//! ## Responsibilities
//!
//! - Load configuration from the environment
//! - Wire [`CounterChaincode`] to an [`InMemoryLedger`]
//! - Serve one JSON invocation per input line and answer with one JSON
//!   response per line
//! - Log committed chaincode events
//!
//! ## Environment
//!
//! | Variable | Default | Purpose |
//! |----------|---------|---------|
//! | `CORE_CHAINCODE_ID_NAME` | required | `<AppId>:<Version>` |
//! | `CORE_PEER_CHANNEL_ID` | `mychannel` | Channel invocations run on |
//! | `CHAINCODE_QUERY_PAGE_SIZE` | `100` | Iterator page size |
//! | `RUST_LOG` | `info` | Log filter |
//!
//! ## Wire Format
//!
//! ```text
//! > {"function":"increment","args":["CAR0"],"identity":{"msp_id":"Org1MSP","attributes":{"AppId":"counter","ChannelId":"mychannel"}}}
//! < {"status":200,"message":""}
//! ```

use counter_chaincode::adapters::{ChaincodeHost, InMemoryLedger, LedgerConfig, Proposal};
use counter_chaincode::config::{ChaincodeConfig, CHAINCODE_ID_ENV};
use counter_chaincode::dispatcher::CounterChaincode;
use counter_chaincode::domain::entities::{ClientIdentity, Response, ResponseStatus};
use counter_chaincode::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Environment variable naming the default channel.
pub const CHANNEL_ID_ENV: &str = "CORE_PEER_CHANNEL_ID";

/// Environment variable overriding the iterator page size.
pub const PAGE_SIZE_ENV: &str = "CHAINCODE_QUERY_PAGE_SIZE";

/// Channel used when none is configured.
pub const DEFAULT_CHANNEL_ID: &str = "mychannel";

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Chaincode identity and authorization settings.
    pub chaincode: ChaincodeConfig,
    /// In-memory ledger settings.
    pub ledger: LedgerConfig,
    /// Default channel for invocations that do not name one.
    pub channel_id: String,
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    load_config_from(|name| std::env::var(name).ok())
}

/// Load configuration from `lookup`, which maps a variable name to its value.
pub fn load_config_from<F>(lookup: F) -> Result<RuntimeConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw_id =
        lookup(CHAINCODE_ID_ENV).ok_or(ConfigError::MissingChaincodeId(CHAINCODE_ID_ENV))?;
    let chaincode = ChaincodeConfig::parse(&raw_id)?;

    let mut ledger = LedgerConfig::default();
    if let Some(raw) = lookup(PAGE_SIZE_ENV) {
        ledger.page_size = match raw.parse::<usize>() {
            Ok(size) if size > 0 => size,
            _ => {
                return Err(ConfigError::InvalidSetting {
                    name: PAGE_SIZE_ENV,
                    value: raw,
                })
            }
        };
    }

    let channel_id = lookup(CHANNEL_ID_ENV)
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CHANNEL_ID.to_string());

    Ok(RuntimeConfig {
        chaincode,
        ledger,
        channel_id,
    })
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// One invocation as read from the input stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Function name.
    pub function: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Channel override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Invoking identity.
    #[serde(default)]
    pub identity: ClientIdentity,
}

impl From<InvocationRequest> for Proposal {
    fn from(request: InvocationRequest) -> Self {
        Proposal {
            function: request.function,
            args: request.args,
            channel_id: request.channel,
            identity: request.identity,
        }
    }
}

/// One response as written to the output stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireResponse {
    /// Numeric status code.
    pub status: u16,
    /// Failure message; empty on success.
    pub message: String,
    /// Success payload as text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl From<Response> for WireResponse {
    fn from(response: Response) -> Self {
        Self {
            status: response.status.code(),
            message: response.message,
            payload: response
                .payload
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

fn malformed(err: &dyn std::fmt::Display) -> WireResponse {
    warn!(error = %err, "Malformed invocation request");
    WireResponse::from(Response::error(
        ResponseStatus::ErrorThreshold,
        format!("malformed request: {err}"),
    ))
}

// =============================================================================
// RUNTIME
// =============================================================================

/// The counter chaincode hosted over an in-memory ledger.
pub struct ChaincodeRuntime {
    host: ChaincodeHost<CounterChaincode>,
}

impl ChaincodeRuntime {
    /// Build the runtime from configuration.
    pub fn new(config: RuntimeConfig) -> Result<Self, ConfigError> {
        let chaincode = CounterChaincode::new(config.chaincode)?;
        let ledger = Arc::new(InMemoryLedger::with_config(config.ledger));
        Ok(Self {
            host: ChaincodeHost::new(chaincode, ledger, config.channel_id),
        })
    }

    /// The underlying host.
    pub fn host(&self) -> &ChaincodeHost<CounterChaincode> {
        &self.host
    }

    /// Run the chaincode's init entry point.
    pub async fn init(&self) -> Response {
        self.host.init(Proposal::new("init", &[])).await
    }

    /// Handle one input line.
    pub async fn handle_line(&self, line: &str) -> WireResponse {
        let request: InvocationRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => return malformed(&e),
        };
        self.host.invoke(request.into()).await.into()
    }

    /// Handle one raw input line, which may not be UTF-8.
    pub async fn handle_bytes(&self, line: &[u8]) -> Option<WireResponse> {
        let line = match std::str::from_utf8(line) {
            Ok(line) => line.trim(),
            Err(e) => return Some(malformed(&e)),
        };
        if line.is_empty() {
            return None;
        }
        Some(self.handle_line(line).await)
    }

    /// Serve invocations from `reader` until end of input.
    ///
    /// Blank lines are skipped. A line that cannot be decoded is answered
    /// with a 400 response and serving continues.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = Vec::new();
        let mut served = 0u64;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let Some(response) = self.handle_bytes(&buf).await else {
                continue;
            };
            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;
            served += 1;
        }
        info!(served, "Input closed");
        Ok(())
    }

    /// Log every committed event until the ledger is dropped.
    pub fn spawn_event_logger(&self) -> JoinHandle<()> {
        let mut events = self.host.ledger().subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(committed) => info!(
                        tx_id = %committed.tx_id,
                        event = %committed.event.name,
                        payload = %String::from_utf8_lossy(&committed.event.payload),
                        "Chaincode event committed"
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event logger lagged");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event stream closed");
                        break;
                    }
                }
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
