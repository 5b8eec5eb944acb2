//! # Operation Dispatcher
//!
//! Resolves an invocation name to an [`Operation`], authorizes the caller
//! and wraps the outcome into a [`Response`].
//!
//! ## Dispatch Order
//!
//! 1. Resolve the function name (unknown → 404, before any identity check)
//! 2. Access guard: channel, then application
//! 3. Run the operation against the ledger stub
//! 4. Map the result onto the response envelope
//!
//! Failures at every step are logged before the envelope is returned.

use crate::config::ChaincodeConfig;
use crate::domain::entities::{InvocationContext, Response};
use crate::errors::{ChaincodeError, ConfigError};
use crate::guard::AccessGuard;
use crate::operations::{self, OperationOutput};
use crate::ports::inbound::Chaincode;
use crate::ports::outbound::LedgerStub;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

// =============================================================================
// OPERATIONS
// =============================================================================

/// The operations this chaincode can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Read a key.
    Get,
    /// Store an arbitrary value.
    Set,
    /// Increment a counter.
    Increment,
    /// Decrement a counter.
    Decrement,
    /// Range read of current state.
    GetAllCars,
    /// History of one key.
    GetHistory,
}

impl Operation {
    /// Every operation, in registration order.
    pub const ALL: [Operation; 6] = [
        Operation::Get,
        Operation::Set,
        Operation::Increment,
        Operation::Decrement,
        Operation::GetAllCars,
        Operation::GetHistory,
    ];

    /// Function name clients invoke.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Set => "set",
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::GetAllCars => "getAllCars",
            Self::GetHistory => "getHistory",
        }
    }

    /// Run the operation.
    pub async fn run(
        self,
        stub: &dyn LedgerStub,
        args: &[String],
    ) -> Result<OperationOutput, ChaincodeError> {
        match self {
            Self::Get => operations::get(stub, args).await,
            Self::Set => operations::set(stub, args).await,
            Self::Increment => operations::increment(stub, args).await,
            Self::Decrement => operations::decrement(stub, args).await,
            Self::GetAllCars => operations::get_all_cars(stub, args).await,
            Self::GetHistory => operations::get_history(stub, args).await,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Name → operation table, validated when it is built.
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Operation>,
}

impl OperationRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every [`Operation`] under its own name.
    pub fn standard() -> Result<Self, ConfigError> {
        Self::from_operations(&Operation::ALL)
    }

    /// Registry holding `operations` under their own names.
    pub fn from_operations(operations: &[Operation]) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for op in operations {
            registry.register(op.name(), *op)?;
        }
        Ok(registry)
    }

    /// Register `op` under `name`.
    ///
    /// # Errors
    ///
    /// * `EmptyOperationName` - `name` is empty
    /// * `DuplicateOperation` - `name` is already registered
    pub fn register(&mut self, name: impl Into<String>, op: Operation) -> Result<(), ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyOperationName);
        }
        if self.operations.contains_key(&name) {
            return Err(ConfigError::DuplicateOperation(name));
        }
        self.operations.insert(name, op);
        Ok(())
    }

    /// Look up the operation for a function name.
    pub fn resolve(&self, name: &str) -> Result<Operation, ChaincodeError> {
        self.operations
            .get(name)
            .copied()
            .ok_or_else(|| ChaincodeError::UnknownFunction(name.to_string()))
    }

    /// Registered function names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Invocation counters. Diagnostic only; never consulted by dispatch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvocationStats {
    /// Total invocations dispatched.
    pub invocations: u64,
    /// Success envelopes returned.
    pub successes: u64,
    /// Unknown function names.
    pub not_found: u64,
    /// Identity check failures.
    pub unauthorized: u64,
    /// Validation and operation failures.
    pub failed: u64,
    /// Average dispatch time in microseconds.
    pub avg_dispatch_time_us: u64,
}

impl InvocationStats {
    fn record(&mut self, outcome: &Result<OperationOutput, ChaincodeError>, elapsed_us: u64) {
        self.invocations += 1;
        match outcome {
            Ok(_) => self.successes += 1,
            Err(ChaincodeError::UnknownFunction(_)) => self.not_found += 1,
            Err(e) if e.is_unauthorized() => self.unauthorized += 1,
            Err(_) => self.failed += 1,
        }
        let total = self.invocations;
        self.avg_dispatch_time_us = self
            .avg_dispatch_time_us
            .saturating_mul(total - 1)
            .saturating_add(elapsed_us)
            / total;
    }
}

// =============================================================================
// CHAINCODE
// =============================================================================

/// The counter chaincode.
pub struct CounterChaincode {
    guard: AccessGuard,
    registry: OperationRegistry,
    stats: RwLock<InvocationStats>,
}

impl CounterChaincode {
    /// Chaincode exposing every standard operation.
    pub fn new(config: ChaincodeConfig) -> Result<Self, ConfigError> {
        Ok(Self::with_registry(config, OperationRegistry::standard()?))
    }

    /// Chaincode exposing the operations in `registry`.
    #[must_use]
    pub fn with_registry(config: ChaincodeConfig, registry: OperationRegistry) -> Self {
        Self {
            guard: AccessGuard::new(config),
            registry,
            stats: RwLock::new(InvocationStats::default()),
        }
    }

    /// Access guard in front of every operation.
    #[must_use]
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// Registered operations.
    #[must_use]
    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Current invocation counters.
    pub async fn stats(&self) -> InvocationStats {
        self.stats.read().await.clone()
    }

    async fn dispatch(
        &self,
        stub: &dyn LedgerStub,
        ctx: &InvocationContext,
    ) -> Result<OperationOutput, ChaincodeError> {
        let op = self.registry.resolve(&ctx.function)?;
        self.guard.authorize(ctx)?;
        debug!(operation = %op, args = ctx.args.len(), "Running operation");
        op.run(stub, &ctx.args).await
    }
}

#[async_trait]
impl Chaincode for CounterChaincode {
    async fn init(&self, _stub: &dyn LedgerStub, ctx: &InvocationContext) -> Response {
        let chaincode_id = &self.guard.config().chaincode_id;
        info!(
            app_id = chaincode_id.app_id(),
            version = chaincode_id.version().unwrap_or("-"),
            channel = %ctx.channel_id,
            "Chaincode initialized"
        );
        Response::success(None)
    }

    #[instrument(
        skip(self, stub, ctx),
        fields(function = %ctx.function, tx_id = %ctx.tx_id, channel = %ctx.channel_id)
    )]
    async fn invoke(&self, stub: &dyn LedgerStub, ctx: &InvocationContext) -> Response {
        let start = Instant::now();
        let outcome = self.dispatch(stub, ctx).await;
        let elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);

        self.stats.write().await.record(&outcome, elapsed_us);

        match outcome {
            Ok(payload) => {
                debug!(
                    payload_len = payload.as_ref().map_or(0, Vec::len),
                    "Invocation succeeded"
                );
                Response::success(payload)
            }
            Err(e) => {
                let status = e.status();
                warn!(status = status.code(), error = %e, "Invocation failed");
                Response::error(status, e.to_string())
            }
        }
    }
}

/// Counter chaincode for app id `counter`, for tests.
pub fn create_test_chaincode() -> Result<CounterChaincode, ConfigError> {
    CounterChaincode::new(ChaincodeConfig::parse("counter:1.0")?)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_ledger::{InMemoryLedger, TxSimulator};
    use crate::domain::entities::{ClientIdentity, ResponseStatus};
    use std::sync::Arc;

    fn authorized() -> ClientIdentity {
        ClientIdentity::new("Org1MSP")
            .with_attribute("ChannelId", "mychannel")
            .with_attribute("AppId", "counter")
    }

    fn ctx(function: &str, args: &[&str], identity: ClientIdentity) -> InvocationContext {
        InvocationContext::new(function, args.iter().map(ToString::to_string).collect())
            .on_channel("mychannel")
            .with_identity(identity)
            .with_tx_id("tx")
    }

    fn setup() -> (CounterChaincode, Arc<InMemoryLedger>) {
        (create_test_chaincode().unwrap(), Arc::new(InMemoryLedger::new()))
    }

    #[test]
    fn test_standard_registry() {
        let registry = OperationRegistry::standard().unwrap();
        assert_eq!(
            registry.names(),
            vec!["decrement", "get", "getAllCars", "getHistory", "increment", "set"]
        );
        assert_eq!(registry.resolve("getAllCars").unwrap(), Operation::GetAllCars);
    }

    #[test]
    fn test_registry_rejects_duplicates_and_empty_names() {
        assert_eq!(
            OperationRegistry::from_operations(&[Operation::Get, Operation::Get]).unwrap_err(),
            ConfigError::DuplicateOperation("get".into())
        );

        let mut registry = OperationRegistry::new();
        assert_eq!(
            registry.register("", Operation::Get).unwrap_err(),
            ConfigError::EmptyOperationName
        );
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_function_is_not_found() {
        let (chaincode, ledger) = setup();
        let stub = TxSimulator::new(ledger, "tx");

        // Unknown name wins over a failing identity.
        let response = chaincode
            .invoke(&stub, &ctx("transfer", &[], ClientIdentity::new("Org1MSP")))
            .await;

        assert_eq!(response.status, ResponseStatus::NotFound);
        assert_eq!(response.message, "Received unknown function transfer invocation");
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_unauthorized_identity() {
        let (chaincode, ledger) = setup();
        let stub = TxSimulator::new(ledger, "tx");
        let identity = ClientIdentity::new("Org1MSP")
            .with_attribute("ChannelId", "mychannel")
            .with_attribute("AppId", "intruder");

        let response = chaincode
            .invoke(&stub, &ctx("increment", &["k"], identity))
            .await;

        assert_eq!(response.status, ResponseStatus::ErrorThreshold);
        assert_eq!(response.message, "Unauthorized");
        assert!(stub.write_set().unwrap().is_empty());
        assert!(stub.event().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let (chaincode, ledger) = setup();
        ledger.seed("k", b"41".to_vec()).unwrap();
        let stub = TxSimulator::new(ledger, "tx");

        let response = chaincode.invoke(&stub, &ctx("get", &["k"], authorized())).await;

        assert!(response.is_success());
        assert_eq!(response.status.code(), 200);
        assert_eq!(response.payload, Some(b"41".to_vec()));
    }

    #[tokio::test]
    async fn test_operation_failure_envelope() {
        let (chaincode, ledger) = setup();
        let stub = TxSimulator::new(ledger, "tx");

        let response = chaincode
            .invoke(&stub, &ctx("get", &["CAR7"], authorized()))
            .await;

        assert_eq!(response.status, ResponseStatus::ErrorThreshold);
        assert_eq!(response.message, "CAR7 does not exist");
        assert_eq!(response.payload, None);
    }

    #[tokio::test]
    async fn test_init_succeeds_without_writes() {
        let (chaincode, ledger) = setup();
        let stub = TxSimulator::new(ledger, "tx");

        let response = chaincode.init(&stub, &ctx("", &[], authorized())).await;

        assert!(response.is_success());
        assert!(stub.write_set().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats_track_outcomes() {
        let (chaincode, ledger) = setup();
        let stub = TxSimulator::new(ledger, "tx");

        chaincode.invoke(&stub, &ctx("get", &["k"], authorized())).await;
        chaincode.invoke(&stub, &ctx("nope", &[], authorized())).await;
        chaincode
            .invoke(&stub, &ctx("increment", &["k"], ClientIdentity::new("x")))
            .await;
        chaincode.invoke(&stub, &ctx("increment", &["k"], authorized())).await;

        let stats = chaincode.stats().await;
        assert_eq!(stats.invocations, 4);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.not_found, 1);
        assert_eq!(stats.unauthorized, 1);
        assert_eq!(stats.failed, 1);
    }
}
