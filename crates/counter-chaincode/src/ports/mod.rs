//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions between the chaincode and the host ledger.
//!
//! - **Driving Port (Inbound)**: `Chaincode`
//! - **Driven Ports (Outbound)**: `LedgerStub`, `QueryIterator`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
