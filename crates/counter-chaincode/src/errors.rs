//! # Error Types
//!
//! All error types for chaincode dispatch, ledger access and configuration.

use crate::domain::entities::ResponseStatus;
use thiserror::Error;

// =============================================================================
// CHAINCODE ERRORS
// =============================================================================

/// Errors that abort a single invocation.
///
/// Every variant maps onto a response status via [`ChaincodeError::status`].
/// The `Display` text is what the caller sees in the response message.
#[derive(Debug, Error, Clone)]
pub enum ChaincodeError {
    /// The invocation named a function that is not registered.
    #[error("Received unknown function {0} invocation")]
    UnknownFunction(String),

    /// The invoking identity failed the channel or application check.
    #[error("Unauthorized")]
    Unauthorized {
        /// Attribute whose assertion failed.
        attribute: String,
    },

    /// Wrong number of positional arguments.
    #[error("Incorrect number of arguments. Expecting {expected}")]
    IncorrectArguments {
        /// Human description of the expected arguments.
        expected: &'static str,
    },

    /// The increment amount is not a decimal integer.
    #[error("Invalid amount {0}: expecting a decimal integer")]
    InvalidAmount(String),

    /// `get` on a key with no (or empty) state.
    #[error("{0} does not exist")]
    DoesNotExist(String),

    /// Counter arithmetic left the signed 64-bit range.
    #[error("counter overflow for key {0}")]
    Overflow(String),

    /// State accessor failure.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Result encoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ChaincodeError {
    /// Response status reported to the host for this failure.
    #[must_use]
    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::UnknownFunction(_) => ResponseStatus::NotFound,
            _ => ResponseStatus::ErrorThreshold,
        }
    }

    /// Returns true if this is an authorization failure.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<serde_json::Error> for ChaincodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// =============================================================================
// LEDGER ERRORS
// =============================================================================

/// Errors from the state accessor and its iterators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// An internal lock was poisoned by a panicking writer.
    #[error("ledger lock poisoned")]
    LockPoisoned,

    /// Empty keys are rejected by the ledger.
    #[error("key must not be empty")]
    EmptyKey,

    /// Event names must be non-empty.
    #[error("event name must not be empty")]
    EmptyEventName,

    /// The iterator was used after `close()`.
    #[error("query iterator already closed")]
    IteratorClosed,

    /// The host ledger is unreachable.
    #[error("ledger unavailable")]
    Unavailable,

    /// Other ledger failure.
    #[error("{0}")]
    Other(String),
}

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

/// Errors raised while building the chaincode at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The chaincode id environment variable is not set.
    #[error("chaincode id not set: export {0}=<AppId>:<Version>")]
    MissingChaincodeId(&'static str),

    /// The chaincode id has no application component.
    #[error("invalid chaincode id {0:?}: expecting <AppId>:<Version>")]
    InvalidChaincodeId(String),

    /// Two operations were registered under one name.
    #[error("duplicate operation name: {0}")]
    DuplicateOperation(String),

    /// An operation was registered with an empty name.
    #[error("operation name must not be empty")]
    EmptyOperationName,

    /// A numeric setting could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    InvalidSetting {
        /// Setting name (environment variable).
        name: &'static str,
        /// Raw value supplied.
        value: String,
    },
}

// =============================================================================
// TESTS
// =============================================================================
