//! # Driven Ports (SPI - Outbound)
//!
//! The ledger interface the chaincode depends on. The host platform (or the
//! in-memory adapter) implements these traits to provide:
//! - World-state reads and writes
//! - Paged range and history iterators
//! - Chaincode events
//!
//! Consensus, validation and commit live behind these traits and are never
//! reimplemented here.

use crate::domain::entities::{KeyModification, KeyValue};
use crate::domain::value_objects::CounterValue;
use crate::errors::{ChaincodeError, LedgerError};
use async_trait::async_trait;

// =============================================================================
// QUERY ITERATOR
// =============================================================================

/// A paged cursor over ledger query results.
///
/// Implementations fetch pages from the host lazily. Callers MUST call
/// [`QueryIterator::close`] on every exit path to release the host-side
/// cursor.
#[async_trait]
pub trait QueryIterator: Send {
    /// Item yielded by the cursor.
    type Item: Send;

    /// Fetch the next item.
    ///
    /// # Returns
    ///
    /// * `Some(item)` - Next result in iteration order
    /// * `None` - The iterator is exhausted
    async fn next(&mut self) -> Result<Option<Self::Item>, LedgerError>;

    /// Release the cursor. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), LedgerError>;
}

/// Iterator over current world state in a key range.
pub type StateQueryIterator = Box<dyn QueryIterator<Item = KeyValue>>;

/// Iterator over the modification history of one key.
pub type HistoryQueryIterator = Box<dyn QueryIterator<Item = KeyModification>>;

// =============================================================================
// LEDGER STUB
// =============================================================================

/// Per-invocation handle onto the host ledger.
///
/// ## Implementation Notes
///
/// - Reads observe committed state; writes are visible only after the host
///   commits the transaction.
/// - Only one event survives per transaction; a later `set_event` replaces
///   an earlier one.
#[async_trait]
pub trait LedgerStub: Send + Sync {
    /// Read a key.
    ///
    /// # Returns
    ///
    /// * `Some(bytes)` - Stored value
    /// * `None` - Key was never written
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError>;

    /// Write a key.
    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError>;

    /// Open a range iterator over `[start_key, end_key)`.
    ///
    /// An empty `start_key` starts at the first key; an empty `end_key`
    /// runs to the last key.
    async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<StateQueryIterator, LedgerError>;

    /// Open an iterator over every committed modification of `key`.
    async fn get_history_for_key(&self, key: &str) -> Result<HistoryQueryIterator, LedgerError>;

    /// Attach a named event to the current transaction.
    fn set_event(&self, name: &str, payload: Vec<u8>) -> Result<(), LedgerError>;

    /// Read a key as a counter, treating absent or non-numeric data as zero.
    ///
    /// A stored number outside the `i64` range fails with
    /// [`ChaincodeError::Overflow`].
    async fn get_counter(&self, key: &str) -> Result<CounterValue, ChaincodeError> {
        let stored = self.get_state(key).await?;
        CounterValue::from_payload(stored.as_deref())
            .ok_or_else(|| ChaincodeError::Overflow(key.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLedger(Option<Vec<u8>>);

    #[async_trait]
    impl LedgerStub for FixedLedger {
        async fn get_state(&self, _key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
            Ok(self.0.clone())
        }

        async fn put_state(&self, _key: &str, _value: Vec<u8>) -> Result<(), LedgerError> {
            Ok(())
        }

        async fn get_state_by_range(
            &self,
            _start_key: &str,
            _end_key: &str,
        ) -> Result<StateQueryIterator, LedgerError> {
            Err(LedgerError::Unavailable)
        }

        async fn get_history_for_key(
            &self,
            _key: &str,
        ) -> Result<HistoryQueryIterator, LedgerError> {
            Err(LedgerError::Unavailable)
        }

        fn set_event(&self, _name: &str, _payload: Vec<u8>) -> Result<(), LedgerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_counter_defaults_to_zero() {
        let absent = FixedLedger(None);
        assert_eq!(absent.get_counter("k").await.unwrap(), CounterValue::ZERO);

        let garbage = FixedLedger(Some(b"xyz".to_vec()));
        assert_eq!(garbage.get_counter("k").await.unwrap(), CounterValue::ZERO);

        let stored = FixedLedger(Some(b"9".to_vec()));
        assert_eq!(stored.get_counter("k").await.unwrap(), CounterValue(9));
    }

    #[tokio::test]
    async fn test_get_counter_out_of_range_fails() {
        let huge = FixedLedger(Some(b"9223372036854775808".to_vec()));
        let err = huge.get_counter("k").await.unwrap_err();
        assert!(matches!(err, ChaincodeError::Overflow(ref k) if k == "k"));
    }
}
