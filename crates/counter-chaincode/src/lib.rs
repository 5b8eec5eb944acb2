//! # Counter Chaincode
//!
//! Identity-guarded counter contract over a ledger's world state.
//!
//! ## Purpose
//!
//! Maintains named integer counters (and arbitrary values) in the ledger,
//! exposes them through a small set of named functions, and restricts every
//! call to identities issued for this application on this channel.
//!
//! ## Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Access Guard | `guard.rs` | `ChannelId` / `AppId` attribute checks |
//! | Dispatcher | `dispatcher.rs` | Name → operation, response envelope |
//! | Operations | `operations.rs` | get, set, increment, decrement, getAllCars, getHistory |
//! | Result Collector | `collector.rs` | Drains and closes query iterators |
//! | Ledger port | `ports/outbound.rs` | `LedgerStub`, `QueryIterator` |
//! | Host shim | `adapters/` | In-memory ledger, transaction simulator, host |
//!
//! ## Response Statuses
//!
//! | Outcome | Status | Message |
//! |---------|--------|---------|
//! | Success | 200 | - |
//! | Unknown function | 404 | `Received unknown function <name> invocation` |
//! | Identity mismatch | 400 | `Unauthorized` |
//! | Validation / missing key | 400 | descriptive |
//!
//! ## Usage Example
//!
//! ```ignore
//! use counter_chaincode::prelude::*;
//!
//! let chaincode = CounterChaincode::new(ChaincodeConfig::from_env()?)?;
//! let host = ChaincodeHost::new(chaincode, Arc::new(InMemoryLedger::new()), "mychannel");
//!
//! let response = host.invoke(Proposal::new("increment", &["CAR0"]).with_identity(id)).await;
//! assert!(response.is_success());
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod events;
pub mod guard;
pub mod operations;
pub mod ports;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain
    pub use crate::domain::entities::{
        ClientIdentity, InvocationContext, KeyModification, KeyValue, QueryRecord, Response,
        ResponseStatus, TxTimestamp,
    };
    pub use crate::domain::value_objects::{ChaincodeId, CounterValue, DecodedValue};

    // Ports
    pub use crate::ports::inbound::Chaincode;
    pub use crate::ports::outbound::{
        HistoryQueryIterator, LedgerStub, QueryIterator, StateQueryIterator,
    };

    // Dispatch
    pub use crate::config::ChaincodeConfig;
    pub use crate::dispatcher::{CounterChaincode, InvocationStats, Operation, OperationRegistry};
    pub use crate::guard::AccessGuard;

    // Events
    pub use crate::events::{ChaincodeEvent, CommittedEvent, PUT_STATE_EVENT};

    // Errors
    pub use crate::errors::{ChaincodeError, ConfigError, LedgerError};

    // Adapters
    pub use crate::adapters::{ChaincodeHost, InMemoryLedger, LedgerConfig, Proposal, TxSimulator};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_exports() {
        use prelude::*;
        let _ = LedgerConfig::default();
        assert_eq!(Operation::ALL.len(), 6);
        assert_eq!(PUT_STATE_EVENT, "putstate");
    }

    #[test]
    fn test_version_set() {
        assert!(!VERSION.is_empty());
    }
}
