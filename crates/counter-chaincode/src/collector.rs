//! # Result Collector
//!
//! Drains a paged query iterator into an ordered list of decoded records.
//!
//! The collection mode follows from the iterator's item type:
//!
//! | Item | Mode | Record |
//! |------|------|--------|
//! | `KeyValue` | current state | `{Key, Record}` |
//! | `KeyModification` | history | `{TxId, Timestamp, IsDelete, Value}` |
//!
//! Items with an empty value are skipped. The iterator is closed on every
//! exit path, including a failed `next()`.

use crate::domain::entities::{KeyModification, KeyValue, QueryRecord};
use crate::domain::value_objects::DecodedValue;
use crate::errors::LedgerError;
use crate::ports::outbound::QueryIterator;
use std::fmt;
use tracing::{debug, warn};

/// Which kind of records a collection produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectMode {
    /// Current world-state entries.
    CurrentState,
    /// Historical modifications of one key.
    History,
}

impl fmt::Display for CollectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentState => f.write_str("current-state"),
            Self::History => f.write_str("history"),
        }
    }
}

/// An iterator item that can be turned into a [`QueryRecord`].
pub trait QueryItem: Send + 'static {
    /// Mode this item type collects in.
    const MODE: CollectMode;

    /// Raw stored bytes.
    fn value(&self) -> &[u8];

    /// Builds the output record around the decoded value.
    fn into_record(self, decoded: DecodedValue) -> QueryRecord;
}

impl QueryItem for KeyValue {
    const MODE: CollectMode = CollectMode::CurrentState;

    fn value(&self) -> &[u8] {
        &self.value
    }

    fn into_record(self, decoded: DecodedValue) -> QueryRecord {
        QueryRecord::State {
            key: self.key,
            record: decoded,
        }
    }
}

impl QueryItem for KeyModification {
    const MODE: CollectMode = CollectMode::History;

    fn value(&self) -> &[u8] {
        &self.value
    }

    fn into_record(self, decoded: DecodedValue) -> QueryRecord {
        QueryRecord::History {
            tx_id: self.tx_id,
            timestamp: self.timestamp,
            is_delete: self.is_delete.to_string(),
            value: decoded,
        }
    }
}

/// Drains `iter` and closes it.
///
/// The iterator is closed even when fetching fails; the fetch error wins
/// over a close error.
pub async fn collect<T: QueryItem>(
    mut iter: Box<dyn QueryIterator<Item = T>>,
) -> Result<Vec<QueryRecord>, LedgerError> {
    let drained = drain(iter.as_mut()).await;
    let closed = iter.close().await;

    let records = match drained {
        Ok(records) => records,
        Err(e) => {
            warn!(mode = %T::MODE, error = %e, "Query iteration failed");
            return Err(e);
        }
    };
    closed?;

    debug!(mode = %T::MODE, count = records.len(), "Query results collected");
    Ok(records)
}

async fn drain<T, I>(iter: &mut I) -> Result<Vec<QueryRecord>, LedgerError>
where
    T: QueryItem,
    I: QueryIterator<Item = T> + ?Sized,
{
    let mut records = Vec::new();
    while let Some(item) = iter.next().await? {
        if item.value().is_empty() {
            continue;
        }
        let decoded = DecodedValue::decode(item.value());
        records.push(item.into_record(decoded));
    }
    Ok(records)
}

// =============================================================================
// TESTS
// =============================================================================
