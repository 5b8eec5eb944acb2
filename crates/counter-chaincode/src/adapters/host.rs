//! # Chaincode Host
//!
//! Drives a [`Chaincode`] against an [`InMemoryLedger`] the way a peer does:
//! one [`TxSimulator`] per proposal, committed only when the chaincode
//! answers with a success envelope.

use crate::adapters::memory_ledger::{InMemoryLedger, TxSimulator};
use crate::domain::entities::{ClientIdentity, InvocationContext, Response, ResponseStatus};
use crate::ports::inbound::Chaincode;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// A transaction proposal as received from a client.
#[derive(Clone, Debug, Default)]
pub struct Proposal {
    /// Function name.
    pub function: String,
    /// Positional arguments.
    pub args: Vec<String>,
    /// Target channel; the host's default channel when `None`.
    pub channel_id: Option<String>,
    /// Invoking identity.
    pub identity: ClientIdentity,
}

impl Proposal {
    /// Proposal for `function` with `args`.
    #[must_use]
    pub fn new(function: impl Into<String>, args: &[&str]) -> Self {
        Self {
            function: function.into(),
            args: args.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// Sets the invoking identity.
    #[must_use]
    pub fn with_identity(mut self, identity: ClientIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Targets a specific channel.
    #[must_use]
    pub fn on_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }
}

/// Executes proposals and commits successful ones.
pub struct ChaincodeHost<C: Chaincode> {
    chaincode: C,
    ledger: Arc<InMemoryLedger>,
    channel_id: String,
}

impl<C: Chaincode> ChaincodeHost<C> {
    /// Host `chaincode` on `channel_id`.
    pub fn new(chaincode: C, ledger: Arc<InMemoryLedger>, channel_id: impl Into<String>) -> Self {
        Self {
            chaincode,
            ledger,
            channel_id: channel_id.into(),
        }
    }

    /// The hosted chaincode.
    pub fn chaincode(&self) -> &C {
        &self.chaincode
    }

    /// The backing ledger.
    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    /// Default channel.
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Run the chaincode's init entry point.
    pub async fn init(&self, proposal: Proposal) -> Response {
        self.execute(proposal, true).await
    }

    /// Run one transaction proposal.
    pub async fn invoke(&self, proposal: Proposal) -> Response {
        self.execute(proposal, false).await
    }

    #[instrument(skip(self, proposal), fields(function = %proposal.function))]
    async fn execute(&self, proposal: Proposal, init: bool) -> Response {
        let tx_id = Uuid::new_v4().simple().to_string();
        let channel_id = proposal
            .channel_id
            .unwrap_or_else(|| self.channel_id.clone());
        let ctx = InvocationContext::new(proposal.function, proposal.args)
            .on_channel(channel_id)
            .with_identity(proposal.identity)
            .with_tx_id(tx_id.clone());

        let simulator = TxSimulator::new(self.ledger.clone(), tx_id.as_str());
        let response = if init {
            self.chaincode.init(&simulator, &ctx).await
        } else {
            self.chaincode.invoke(&simulator, &ctx).await
        };

        if !response.is_success() {
            debug!(tx_id = %tx_id, status = response.status.code(), "Transaction discarded");
            return response;
        }

        match self.ledger.commit(simulator) {
            Ok(_) => response,
            Err(e) => {
                error!(tx_id = %tx_id, error = %e, "Commit failed");
                Response::error(ResponseStatus::ErrorThreshold, format!("commit failed: {e}"))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
