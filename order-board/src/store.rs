//! Client-side order store
//!
//! Holds the active working set. Every entry carries a [`SyncState`]:
//! either confirmed by the backing store, or pending with the last
//! confirmed snapshot and the writes still in flight on top of it. Only
//! the reconciler mutates it.

use shared::order::{OrderPatch, OrderSnapshot};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Identifier of one optimistic write
pub type WriteId = Uuid;

/// One optimistic write awaiting acknowledgment
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub write_id: WriteId,
    pub patch: OrderPatch,
}

/// Confirmation state of a stored order
#[derive(Debug, Clone, PartialEq)]
pub enum SyncState {
    Confirmed,
    /// Optimistic writes in flight
    Pending {
        /// Last confirmed snapshot, the base every write is replayed on
        prior: Box<OrderSnapshot>,
        /// Unacknowledged writes, oldest first
        writes: Vec<PendingWrite>,
    },
}

impl SyncState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncState::Pending { .. })
    }

    /// Number of unacknowledged writes
    pub fn write_count(&self) -> usize {
        match self {
            SyncState::Confirmed => 0,
            SyncState::Pending { writes, .. } => writes.len(),
        }
    }

    pub fn holds(&self, write_id: WriteId) -> bool {
        match self {
            SyncState::Confirmed => false,
            SyncState::Pending { writes, .. } => writes.iter().any(|w| w.write_id == write_id),
        }
    }
}

/// Order plus its confirmation state
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedOrder {
    pub order: OrderSnapshot,
    pub sync: SyncState,
}

impl TrackedOrder {
    pub fn confirmed(order: OrderSnapshot) -> Self {
        Self {
            order,
            sync: SyncState::Confirmed,
        }
    }

    /// Apply a patch optimistically on top of any writes already in flight
    pub fn stage(&mut self, write_id: WriteId, patch: OrderPatch) {
        if !self.sync.is_pending() {
            self.sync = SyncState::Pending {
                prior: Box::new(self.order.clone()),
                writes: Vec::new(),
            };
        }
        if let SyncState::Pending { writes, .. } = &mut self.sync {
            patch.apply_to(&mut self.order);
            writes.push(PendingWrite { write_id, patch });
        }
    }

    /// Fold an acknowledged write into the confirmed base.
    ///
    /// Returns the write's patch, or `None` if this entry does not hold it.
    pub fn confirm(&mut self, write_id: WriteId) -> Option<OrderPatch> {
        let SyncState::Pending { prior, writes } = &mut self.sync else {
            return None;
        };
        let index = writes.iter().position(|w| w.write_id == write_id)?;
        let write = writes.remove(index);
        write.patch.apply_to(prior);
        if writes.is_empty() {
            self.sync = SyncState::Confirmed;
        }
        Some(write.patch)
    }

    /// Drop a failed write and replay the remaining ones over the confirmed base.
    ///
    /// Returns false if this entry does not hold the write.
    pub fn revert(&mut self, write_id: WriteId) -> bool {
        let SyncState::Pending { prior, writes } = &mut self.sync else {
            return false;
        };
        let Some(index) = writes.iter().position(|w| w.write_id == write_id) else {
            return false;
        };
        writes.remove(index);
        self.order = replay(prior, writes);
        if writes.is_empty() {
            self.sync = SyncState::Confirmed;
        }
        true
    }

    /// Merge a remote snapshot, keeping any speculative fields on top
    pub fn merge_remote(&mut self, remote: &OrderSnapshot) {
        match &mut self.sync {
            SyncState::Confirmed => self.order.merge_remote(remote),
            SyncState::Pending { prior, writes } => {
                prior.merge_remote(remote);
                let mut merged = replay(prior, writes);
                merged.status = merged.status.furthest(self.order.status);
                self.order = merged;
            }
        }
    }
}

fn replay(prior: &OrderSnapshot, writes: &[PendingWrite]) -> OrderSnapshot {
    let mut order = prior.clone();
    for write in writes {
        write.patch.apply_to(&mut order);
    }
    order
}

/// Active orders, keyed by id
#[derive(Debug, Default)]
pub struct OrderStore {
    entries: HashMap<String, TrackedOrder>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, order_id: &str) -> Option<&TrackedOrder> {
        self.entries.get(order_id)
    }

    pub(crate) fn get_mut(&mut self, order_id: &str) -> Option<&mut TrackedOrder> {
        self.entries.get_mut(order_id)
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.entries.contains_key(order_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unacknowledged writes across every entry
    pub fn write_count(&self) -> usize {
        self.entries.values().map(|e| e.sync.write_count()).sum()
    }

    /// Insert unless already present. Returns false on duplicate.
    pub(crate) fn insert_new(&mut self, entry: TrackedOrder) -> bool {
        if self.entries.contains_key(&entry.order.order_id) {
            return false;
        }
        self.entries.insert(entry.order.order_id.clone(), entry);
        true
    }

    pub(crate) fn put(&mut self, entry: TrackedOrder) {
        self.entries.insert(entry.order.order_id.clone(), entry);
    }

    pub(crate) fn remove(&mut self, order_id: &str) -> Option<TrackedOrder> {
        self.entries.remove(order_id)
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (String, TrackedOrder)> + '_ {
        self.entries.drain()
    }

    /// Orders sorted by creation time (oldest first)
    pub fn snapshot(&self) -> Vec<OrderSnapshot> {
        let mut orders: Vec<OrderSnapshot> =
            self.entries.values().map(|e| e.order.clone()).collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.display_number.cmp(&b.display_number))
        });
        orders
    }

    /// Ids with an unconfirmed optimistic write
    pub fn pending_ids(&self) -> HashSet<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.sync.is_pending())
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// What is remembered about an order that left the active set for good
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tombstone {
    /// `None` for deletions
    pub status: Option<shared::order::OrderStatus>,
    pub finalized_at: Option<i64>,
    pub elapsed_seconds: Option<i64>,
}

impl Tombstone {
    pub fn finalized(order: &OrderSnapshot) -> Self {
        Self {
            status: Some(order.status),
            finalized_at: order.finalized_at,
            elapsed_seconds: order.elapsed_seconds,
        }
    }

    pub fn deleted() -> Self {
        Self {
            status: None,
            finalized_at: None,
            elapsed_seconds: None,
        }
    }
}

/// Bounded ledger of finalized/deleted order ids
///
/// First record for an id wins; later records are ignored.
#[derive(Debug)]
pub struct FinalizedLedger {
    capacity: usize,
    records: HashMap<String, Tombstone>,
    order: VecDeque<String>,
}

impl FinalizedLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.records.contains_key(order_id)
    }

    pub fn get(&self, order_id: &str) -> Option<&Tombstone> {
        self.records.get(order_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record a tombstone. Returns false if the id was already recorded.
    pub fn record(&mut self, order_id: &str, tombstone: Tombstone) -> bool {
        if self.records.contains_key(order_id) {
            return false;
        }
        self.records.insert(order_id.to_string(), tombstone);
        self.order.push_back(order_id.to_string());
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.records.remove(&evicted);
            }
        }
        true
    }
}
