//! # Chaincode Events
//!
//! Change notifications attached to transactions. Subscribers see an event
//! only once the transaction carrying it is committed.

use serde::{Deserialize, Serialize};

/// Event name emitted on every counter mutation.
pub const PUT_STATE_EVENT: &str = "putstate";

/// A named event set by the chaincode during a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeEvent {
    /// Event name.
    pub name: String,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl ChaincodeEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// An event together with the transaction that committed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedEvent {
    /// Committing transaction.
    pub tx_id: String,
    /// The event itself.
    pub event: ChaincodeEvent,
}
