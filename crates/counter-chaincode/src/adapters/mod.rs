//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - `memory_ledger` - In-memory world state, history and transaction simulator
//! - `host` - Proposal execution and commit over the in-memory ledger

pub mod host;
pub mod memory_ledger;

pub use host::{ChaincodeHost, Proposal};
pub use memory_ledger::{InMemoryLedger, LedgerCommit, LedgerConfig, TxSimulator};
