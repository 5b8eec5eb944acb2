//! # Counter Operations
//!
//! Business logic behind each exposed function. Every operation validates
//! its positional arguments, talks to the ledger only through
//! [`LedgerStub`] and returns the success payload (if any).
//!
//! | Function | Arguments | Payload |
//! |----------|-----------|---------|
//! | `get` | key | stored bytes |
//! | `set` | key, value | value |
//! | `increment` | key [, amount] | none |
//! | `decrement` | key | none |
//! | `getAllCars` | startKey [, endKey] | JSON list of `{Key, Record}` |
//! | `getHistory` | key | JSON list of `{TxId, Timestamp, IsDelete, Value}` |

use crate::collector;
use crate::domain::services::{next_decrement, next_increment, parse_amount};
use crate::domain::value_objects::CounterValue;
use crate::errors::ChaincodeError;
use crate::events::PUT_STATE_EVENT;
use crate::ports::outbound::LedgerStub;
use tracing::{debug, info};

/// Success payload of an operation.
pub type OperationOutput = Option<Vec<u8>>;

/// Returns the stored bytes of a key unchanged.
pub async fn get(
    stub: &dyn LedgerStub,
    args: &[String],
) -> Result<OperationOutput, ChaincodeError> {
    let [key] = args else {
        return Err(ChaincodeError::IncorrectArguments { expected: "a key" });
    };

    match stub.get_state(key).await? {
        Some(value) if !value.is_empty() => {
            debug!(key = %key, len = value.len(), "State read");
            Ok(Some(value))
        }
        _ => Err(ChaincodeError::DoesNotExist(key.clone())),
    }
}

/// Stores an arbitrary value under a key and returns it.
pub async fn set(
    stub: &dyn LedgerStub,
    args: &[String],
) -> Result<OperationOutput, ChaincodeError> {
    let [key, value] = args else {
        return Err(ChaincodeError::IncorrectArguments {
            expected: "a key and a value",
        });
    };

    let payload = value.as_bytes().to_vec();
    stub.set_event(PUT_STATE_EVENT, payload.clone())?;
    stub.put_state(key, payload.clone()).await?;
    info!(key = %key, "State set");
    Ok(Some(payload))
}

/// Increments a counter, optionally by an explicit amount.
///
/// See [`next_increment`] for the exact transform; an absent counter
/// becomes 1.
pub async fn increment(
    stub: &dyn LedgerStub,
    args: &[String],
) -> Result<OperationOutput, ChaincodeError> {
    let (key, amount) = match args {
        [key] => (key, None),
        [key, raw] => {
            let amount =
                parse_amount(raw).ok_or_else(|| ChaincodeError::InvalidAmount(raw.clone()))?;
            (key, Some(amount))
        }
        _ => {
            return Err(ChaincodeError::IncorrectArguments {
                expected: "a key and an optional amount",
            })
        }
    };

    let current = stub.get_counter(key).await?;
    let next =
        next_increment(current, amount).ok_or_else(|| ChaincodeError::Overflow(key.clone()))?;

    store_counter(stub, key, current, next).await?;
    Ok(None)
}

/// Decrements a counter, flooring at zero.
pub async fn decrement(
    stub: &dyn LedgerStub,
    args: &[String],
) -> Result<OperationOutput, ChaincodeError> {
    let [key] = args else {
        return Err(ChaincodeError::IncorrectArguments { expected: "a key" });
    };

    let current = stub.get_counter(key).await?;
    let next = next_decrement(current).ok_or_else(|| ChaincodeError::Overflow(key.clone()))?;

    store_counter(stub, key, current, next).await?;
    Ok(None)
}

/// Returns every record in `[startKey, endKey)` as JSON.
///
/// A missing end key scans to the last key.
pub async fn get_all_cars(
    stub: &dyn LedgerStub,
    args: &[String],
) -> Result<OperationOutput, ChaincodeError> {
    let (start_key, end_key) = match args {
        [start] => (start.as_str(), ""),
        [start, end] => (start.as_str(), end.as_str()),
        _ => {
            return Err(ChaincodeError::IncorrectArguments {
                expected: "a start key and an optional end key",
            })
        }
    };

    let iter = stub.get_state_by_range(start_key, end_key).await?;
    let records = collector::collect(iter).await?;
    debug!(start_key, end_key, count = records.len(), "Range query complete");
    Ok(Some(serde_json::to_vec(&records)?))
}

/// Returns the modification history of a key as JSON.
pub async fn get_history(
    stub: &dyn LedgerStub,
    args: &[String],
) -> Result<OperationOutput, ChaincodeError> {
    let [key] = args else {
        return Err(ChaincodeError::IncorrectArguments { expected: "a key" });
    };

    let iter = stub.get_history_for_key(key).await?;
    let records = collector::collect(iter).await?;
    debug!(key = %key, count = records.len(), "History query complete");
    Ok(Some(serde_json::to_vec(&records)?))
}

/// Emits the change event, then writes the new counter value.
async fn store_counter(
    stub: &dyn LedgerStub,
    key: &str,
    current: CounterValue,
    next: CounterValue,
) -> Result<(), ChaincodeError> {
    let payload = next.to_payload();
    stub.set_event(PUT_STATE_EVENT, payload.clone())?;
    stub.put_state(key, payload).await?;
    info!(key, from = %current, to = %next, "Counter updated");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
