//! # In-Memory Ledger
//!
//! A stand-in for the host ledger used by tests and the development runtime.
//! The production host implements [`LedgerStub`] over its own peer protocol.
//!
//! - [`InMemoryLedger`] holds committed world state, per-key history and
//!   committed events.
//! - [`TxSimulator`] is the per-invocation stub: reads see committed state,
//!   writes and the event are buffered until [`InMemoryLedger::commit`].
//! - Range and history iterators fetch fixed-size pages and hold a cursor
//!   lease that is released on `close()` or drop.

use crate::domain::entities::{KeyModification, KeyValue, TxTimestamp};
use crate::errors::LedgerError;
use crate::events::{ChaincodeEvent, CommittedEvent};
use crate::ports::outbound::{
    HistoryQueryIterator, LedgerStub, QueryIterator, StateQueryIterator,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::debug;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// In-memory ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Results fetched per iterator page.
    pub page_size: usize,
    /// Buffered committed events per subscriber.
    pub event_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            event_capacity: 256,
        }
    }
}

// =============================================================================
// LEDGER
// =============================================================================

#[derive(Debug, Default)]
struct LedgerState {
    world: BTreeMap<String, Vec<u8>>,
    history: HashMap<String, Vec<KeyModification>>,
    events: Vec<CommittedEvent>,
}

/// Summary of one committed transaction.
#[derive(Debug)]
pub struct LedgerCommit {
    /// Committed transaction.
    pub tx_id: String,
    /// Commit timestamp.
    pub timestamp: TxTimestamp,
    /// Number of keys written.
    pub writes: usize,
    /// Whether an event was published.
    pub event_published: bool,
}

/// In-memory world state, history and event log.
#[derive(Debug)]
pub struct InMemoryLedger {
    config: LedgerConfig,
    state: RwLock<LedgerState>,
    open_iterators: AtomicUsize,
    events_tx: broadcast::Sender<CommittedEvent>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Create an empty ledger with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Create an empty ledger.
    #[must_use]
    pub fn with_config(config: LedgerConfig) -> Self {
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            state: RwLock::new(LedgerState::default()),
            open_iterators: AtomicUsize::new(0),
            events_tx,
        }
    }

    /// Ledger configuration.
    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Read committed state directly.
    pub fn state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.world.get(key).cloned())
    }

    /// Number of committed keys.
    pub fn len(&self) -> Result<usize, LedgerError> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.world.len())
    }

    /// Returns true if no key was ever committed.
    pub fn is_empty(&self) -> Result<bool, LedgerError> {
        Ok(self.len()? == 0)
    }

    /// Every committed event, oldest first.
    pub fn committed_events(&self) -> Result<Vec<CommittedEvent>, LedgerError> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.events.clone())
    }

    /// Subscribe to events as their transactions commit.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CommittedEvent> {
        self.events_tx.subscribe()
    }

    /// Iterators opened and not yet closed or dropped.
    #[must_use]
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.load(Ordering::SeqCst)
    }

    /// Commit a single key outside any chaincode invocation.
    pub fn seed(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        let mut writes = BTreeMap::new();
        writes.insert(key.to_string(), value);
        self.apply(&format!("seed-{key}"), writes, None).map(|_| ())
    }

    /// Commit a simulated transaction: apply its writes, append history and
    /// publish its event.
    pub fn commit(&self, simulator: TxSimulator) -> Result<LedgerCommit, LedgerError> {
        let TxSimulator {
            tx_id,
            writes,
            event,
            ..
        } = simulator;
        let writes = writes.into_inner().map_err(|_| LedgerError::LockPoisoned)?;
        let event = event.into_inner().map_err(|_| LedgerError::LockPoisoned)?;
        self.apply(&tx_id, writes, event)
    }

    fn apply(
        &self,
        tx_id: &str,
        writes: BTreeMap<String, Vec<u8>>,
        event: Option<ChaincodeEvent>,
    ) -> Result<LedgerCommit, LedgerError> {
        let timestamp = TxTimestamp::now();
        let write_count = writes.len();
        let committed_event = event.map(|event| CommittedEvent {
            tx_id: tx_id.to_string(),
            event,
        });

        {
            let mut state = self.state.write().map_err(|_| LedgerError::LockPoisoned)?;
            for (key, value) in writes {
                state
                    .history
                    .entry(key.clone())
                    .or_default()
                    .push(KeyModification {
                        tx_id: tx_id.to_string(),
                        value: value.clone(),
                        timestamp,
                        is_delete: false,
                    });
                state.world.insert(key, value);
            }
            if let Some(event) = &committed_event {
                state.events.push(event.clone());
            }
        }

        let event_published = committed_event.is_some();
        if let Some(event) = committed_event {
            // No subscribers is not an error.
            let _ = self.events_tx.send(event);
        }

        debug!(tx_id, writes = write_count, event_published, "Transaction committed");
        Ok(LedgerCommit {
            tx_id: tx_id.to_string(),
            timestamp,
            writes: write_count,
            event_published,
        })
    }

    fn range_page(
        &self,
        lower: &Bound<String>,
        end_key: &str,
    ) -> Result<Vec<KeyValue>, LedgerError> {
        let upper = if end_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Excluded(end_key.to_string())
        };
        if range_is_empty(lower, &upper) {
            return Ok(Vec::new());
        }

        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state
            .world
            .range::<String, _>((lower.clone(), upper))
            .take(self.page_size())
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    fn history_page(&self, key: &str, offset: usize) -> Result<Vec<KeyModification>, LedgerError> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state
            .history
            .get(key)
            .map(|entries| {
                entries
                    .iter()
                    .skip(offset)
                    .take(self.page_size())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn page_size(&self) -> usize {
        self.config.page_size.max(1)
    }
}

/// Returns true when `(lower, upper)` cannot contain any key. Guards
/// `BTreeMap::range`, which panics on inverted bounds.
fn range_is_empty(lower: &Bound<String>, upper: &Bound<String>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Excluded(u)) => l >= u,
        (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}

// =============================================================================
// CURSOR LEASE
// =============================================================================

/// Tracks one open iterator against the ledger's open count.
#[derive(Debug)]
struct CursorLease {
    ledger: Arc<InMemoryLedger>,
    released: bool,
}

impl CursorLease {
    fn acquire(ledger: Arc<InMemoryLedger>) -> Self {
        ledger.open_iterators.fetch_add(1, Ordering::SeqCst);
        Self {
            ledger,
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.ledger.open_iterators.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn ensure_open(&self) -> Result<&InMemoryLedger, LedgerError> {
        if self.released {
            return Err(LedgerError::IteratorClosed);
        }
        Ok(&self.ledger)
    }
}

impl Drop for CursorLease {
    fn drop(&mut self) {
        self.release();
    }
}

// =============================================================================
// ITERATORS
// =============================================================================

/// Paged iterator over `[start_key, end_key)` of committed state.
#[derive(Debug)]
pub struct RangeIterator {
    lease: CursorLease,
    lower: Bound<String>,
    end_key: String,
    page: VecDeque<KeyValue>,
    exhausted: bool,
    pages_fetched: usize,
}

impl RangeIterator {
    fn open(ledger: Arc<InMemoryLedger>, start_key: &str, end_key: &str) -> Self {
        let lower = if start_key.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start_key.to_string())
        };
        Self {
            lease: CursorLease::acquire(ledger),
            lower,
            end_key: end_key.to_string(),
            page: VecDeque::new(),
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Pages fetched from the ledger so far.
    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    fn fetch_page(&mut self) -> Result<(), LedgerError> {
        let ledger = self.lease.ensure_open()?;
        let page = ledger.range_page(&self.lower, &self.end_key)?;
        let page_size = ledger.page_size();

        self.pages_fetched += 1;
        self.exhausted = page.len() < page_size;
        if let Some(last) = page.last() {
            self.lower = Bound::Excluded(last.key.clone());
        }
        self.page.extend(page);
        Ok(())
    }
}

#[async_trait]
impl QueryIterator for RangeIterator {
    type Item = KeyValue;

    async fn next(&mut self) -> Result<Option<KeyValue>, LedgerError> {
        self.lease.ensure_open()?;
        if self.page.is_empty() && !self.exhausted {
            self.fetch_page()?;
        }
        Ok(self.page.pop_front())
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        if !self.lease.released {
            debug!(pages = self.pages_fetched(), "Range iterator closed");
        }
        self.page.clear();
        self.lease.release();
        Ok(())
    }
}

/// Paged iterator over the committed history of one key.
#[derive(Debug)]
pub struct HistoryIterator {
    lease: CursorLease,
    key: String,
    offset: usize,
    page: VecDeque<KeyModification>,
    exhausted: bool,
}

impl HistoryIterator {
    fn open(ledger: Arc<InMemoryLedger>, key: &str) -> Self {
        Self {
            lease: CursorLease::acquire(ledger),
            key: key.to_string(),
            offset: 0,
            page: VecDeque::new(),
            exhausted: false,
        }
    }

    fn fetch_page(&mut self) -> Result<(), LedgerError> {
        let ledger = self.lease.ensure_open()?;
        let page = ledger.history_page(&self.key, self.offset)?;

        self.exhausted = page.len() < ledger.page_size();
        self.offset += page.len();
        self.page.extend(page);
        Ok(())
    }
}

#[async_trait]
impl QueryIterator for HistoryIterator {
    type Item = KeyModification;

    async fn next(&mut self) -> Result<Option<KeyModification>, LedgerError> {
        self.lease.ensure_open()?;
        if self.page.is_empty() && !self.exhausted {
            self.fetch_page()?;
        }
        Ok(self.page.pop_front())
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.page.clear();
        self.lease.release();
        Ok(())
    }
}

// =============================================================================
// TRANSACTION SIMULATOR
// =============================================================================

/// Per-invocation [`LedgerStub`] over an [`InMemoryLedger`].
///
/// Reads do not observe this transaction's own writes. Nothing reaches the
/// ledger until the simulator is passed to [`InMemoryLedger::commit`];
/// dropping it discards the transaction.
#[derive(Debug)]
pub struct TxSimulator {
    ledger: Arc<InMemoryLedger>,
    tx_id: String,
    writes: Mutex<BTreeMap<String, Vec<u8>>>,
    event: Mutex<Option<ChaincodeEvent>>,
}

impl TxSimulator {
    /// Start simulating transaction `tx_id`.
    #[must_use]
    pub fn new(ledger: Arc<InMemoryLedger>, tx_id: impl Into<String>) -> Self {
        Self {
            ledger,
            tx_id: tx_id.into(),
            writes: Mutex::new(BTreeMap::new()),
            event: Mutex::new(None),
        }
    }

    /// Transaction id.
    #[must_use]
    pub fn tx_id(&self) -> &str {
        &self.tx_id
    }

    /// Buffered writes.
    pub fn write_set(&self) -> Result<BTreeMap<String, Vec<u8>>, LedgerError> {
        Ok(self
            .writes
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?
            .clone())
    }

    /// Buffered event.
    pub fn event(&self) -> Result<Option<ChaincodeEvent>, LedgerError> {
        Ok(self
            .event
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?
            .clone())
    }
}

fn require_key(key: &str) -> Result<(), LedgerError> {
    if key.is_empty() {
        return Err(LedgerError::EmptyKey);
    }
    Ok(())
}

#[async_trait]
impl LedgerStub for TxSimulator {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        require_key(key)?;
        self.ledger.state(key)
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), LedgerError> {
        require_key(key)?;
        self.writes
            .lock()
            .map_err(|_| LedgerError::LockPoisoned)?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn get_state_by_range(
        &self,
        start_key: &str,
        end_key: &str,
    ) -> Result<StateQueryIterator, LedgerError> {
        Ok(Box::new(RangeIterator::open(
            self.ledger.clone(),
            start_key,
            end_key,
        )))
    }

    async fn get_history_for_key(&self, key: &str) -> Result<HistoryQueryIterator, LedgerError> {
        require_key(key)?;
        Ok(Box::new(HistoryIterator::open(self.ledger.clone(), key)))
    }

    fn set_event(&self, name: &str, payload: Vec<u8>) -> Result<(), LedgerError> {
        if name.is_empty() {
            return Err(LedgerError::EmptyEventName);
        }
        *self.event.lock().map_err(|_| LedgerError::LockPoisoned)? =
            Some(ChaincodeEvent::new(name, payload));
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
