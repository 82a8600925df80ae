//! Reconciler - the order lifecycle state machine
//!
//! Owns the [`OrderStore`] and is the only thing that mutates it. It is
//! synchronous: the runtime feeds it local requests, write acknowledgments
//! and remote change events one at a time, and acts on what it returns.
//!
//! # Local write flow
//!
//! ```text
//! request_transition / toggle_paid / discard
//!     ├─ 1. Validate against the current entry (store untouched on error)
//!     ├─ 2. Apply optimistically over any writes already in flight
//!     │      ├─ active target    → entry stays, SyncState::Pending
//!     │      └─ finalized/delete → entry leaves the store, held as detached
//!     └─ 3. Return a WriteRequest for the runtime to persist
//!
//! complete_write(write_id, result)
//!     ├─ Ok  → fold into the confirmed base (finalized: tombstone + side effect)
//!     └─ Err → drop the write, replay the rest over the confirmed base
//! ```
//!
//! Every finalization, local or remote, yields exactly one outcome carrying
//! the final snapshot, at the moment the order leaves the board for good.
//!
//! # Tie-break
//!
//! A finalized or deleted order is tombstoned in the [`FinalizedLedger`].
//! Nothing brings it back: stale remote events are ignored and local
//! requests against it fail with [`TransitionError::OrderFinalized`].

#[cfg(test)]
mod tests;

use crate::elapsed::seconds_since;
use crate::error::TransitionError;
use crate::store::{FinalizedLedger, OrderStore, Tombstone, TrackedOrder, WriteId};
use shared::order::{ChangeEvent, ChangeKind, OrderPatch, OrderSnapshot, OrderStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// Persistence call the runtime must make for an accepted local request
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Update(OrderPatch),
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub write_id: WriteId,
    pub order_id: String,
    pub op: WriteOp,
}

/// Result of acknowledging a write
#[derive(Debug)]
pub enum WriteOutcome {
    /// Optimistic change is now confirmed
    Confirmed { order_id: String, patch: OrderPatch },
    /// Order finalized durably; run finalization side effects
    Finalized(OrderSnapshot),
    /// Order deleted durably
    Discarded(OrderSnapshot),
    /// Write failed; the order is back to its confirmed state plus any
    /// writes still in flight
    Reverted {
        order_id: String,
        restored: OrderSnapshot,
        error: anyhow::Error,
    },
    /// A remote event already removed the order; nothing to confirm or revert
    Superseded {
        order_id: String,
        error: Option<anyhow::Error>,
    },
    /// Unknown write id
    Unknown,
}

/// Result of applying a remote change event
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    Inserted(String),
    Merged(String),
    /// Deleted remotely
    Removed(String),
    /// Finalized remotely while on the board; run finalization side effects
    Finalized(OrderSnapshot),
    /// Duplicate, stale or irrelevant event
    Ignored,
    /// Active update for an untracked order; a full refetch is needed
    Gap(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetachKind {
    Finalize,
    Delete,
}

/// Order optimistically removed from the store, awaiting its write ack
#[derive(Debug)]
struct Detached {
    write_id: WriteId,
    kind: DetachKind,
    /// Optimistic final state
    order: OrderSnapshot,
    /// Entry to restore on failure, with any earlier writes still in flight
    prior: TrackedOrder,
    /// A remote terminal event arrived while detached
    finalized_remotely: bool,
}

/// Lifecycle state machine over the active order set
#[derive(Debug)]
pub struct Reconciler {
    store: OrderStore,
    detached: HashMap<String, Detached>,
    ledger: FinalizedLedger,
}

impl Reconciler {
    pub fn new(tombstone_capacity: usize) -> Self {
        Self {
            store: OrderStore::new(),
            detached: HashMap::new(),
            ledger: FinalizedLedger::new(tombstone_capacity),
        }
    }

    pub fn store(&self) -> &OrderStore {
        &self.store
    }

    /// Tombstone for an order that left the active set for good
    pub fn finalized(&self, order_id: &str) -> Option<&Tombstone> {
        self.ledger.get(order_id)
    }

    /// Writes awaiting acknowledgment
    pub fn in_flight(&self) -> usize {
        let detached: usize = self
            .detached
            .values()
            .map(|d| 1 + d.prior.sync.write_count())
            .sum();
        self.store.write_count() + detached
    }

    // ========================================================================
    // Local requests
    // ========================================================================

    /// Validate and optimistically apply a status change.
    ///
    /// Validation runs against the optimistic status, so a change may be
    /// requested while earlier writes are still in flight. Finalizing
    /// targets stamp `finalized_at`/`elapsed_seconds` (if unset) and take
    /// the order out of the store immediately.
    pub fn request_transition(
        &mut self,
        order_id: &str,
        target: OrderStatus,
        now: i64,
    ) -> Result<WriteRequest, TransitionError> {
        let current = self.writable(order_id)?;

        if !current.order.status.can_transition_to(target) {
            return Err(TransitionError::InvalidTransition {
                order_id: order_id.to_string(),
                from: current.order.status,
                to: target,
            });
        }

        let mut patch = OrderPatch::status(target);
        if target.is_finalized() && current.order.finalized_at.is_none() {
            patch.finalized_at = Some(now);
            patch.elapsed_seconds = Some(seconds_since(current.order.created_at, now));
        }

        let write_id = Uuid::new_v4();
        if target.is_finalized() {
            self.detach(order_id, write_id, DetachKind::Finalize, Some(&patch));
        } else {
            self.stage(order_id, write_id, &patch);
        }

        tracing::debug!(order_id = %order_id, target = %target, write_id = %write_id, "Transition applied optimistically");
        Ok(WriteRequest {
            write_id,
            order_id: order_id.to_string(),
            op: WriteOp::Update(patch),
        })
    }

    /// Flip the paid flag optimistically. Status is untouched.
    pub fn toggle_paid(&mut self, order_id: &str) -> Result<WriteRequest, TransitionError> {
        let paid = !self.writable(order_id)?.order.paid;
        let patch = OrderPatch::paid(paid);
        let write_id = Uuid::new_v4();
        self.stage(order_id, write_id, &patch);

        tracing::debug!(order_id = %order_id, paid, write_id = %write_id, "Paid flag toggled optimistically");
        Ok(WriteRequest {
            write_id,
            order_id: order_id.to_string(),
            op: WriteOp::Update(patch),
        })
    }

    /// Remove an order optimistically and request its deletion
    pub fn discard(&mut self, order_id: &str) -> Result<WriteRequest, TransitionError> {
        self.writable(order_id)?;
        let write_id = Uuid::new_v4();
        self.detach(order_id, write_id, DetachKind::Delete, None);

        tracing::debug!(order_id = %order_id, write_id = %write_id, "Order discarded optimistically");
        Ok(WriteRequest {
            write_id,
            order_id: order_id.to_string(),
            op: WriteOp::Delete,
        })
    }

    /// Track an order created by the capture flow.
    ///
    /// Returns `Ok(false)` if the id is already tracked.
    pub fn adopt(&mut self, order: OrderSnapshot) -> Result<bool, TransitionError> {
        if order.is_finalized()
            || self.ledger.contains(&order.order_id)
            || self.detached.contains_key(&order.order_id)
        {
            return Err(TransitionError::OrderFinalized(order.order_id));
        }
        Ok(self.store.insert_new(TrackedOrder::confirmed(order)))
    }

    /// Entry that may accept a new local write
    fn writable(&self, order_id: &str) -> Result<&TrackedOrder, TransitionError> {
        if self.ledger.contains(order_id) || self.detached.contains_key(order_id) {
            return Err(TransitionError::OrderFinalized(order_id.to_string()));
        }
        self.store
            .get(order_id)
            .ok_or_else(|| TransitionError::OrderNotFound(order_id.to_string()))
    }

    fn stage(&mut self, order_id: &str, write_id: WriteId, patch: &OrderPatch) {
        if let Some(entry) = self.store.get_mut(order_id) {
            entry.stage(write_id, patch.clone());
        }
    }

    fn detach(
        &mut self,
        order_id: &str,
        write_id: WriteId,
        kind: DetachKind,
        patch: Option<&OrderPatch>,
    ) {
        if let Some(prior) = self.store.remove(order_id) {
            let mut order = prior.order.clone();
            if let Some(patch) = patch {
                patch.apply_to(&mut order);
            }
            self.detached.insert(
                order_id.to_string(),
                Detached {
                    write_id,
                    kind,
                    order,
                    prior,
                    finalized_remotely: false,
                },
            );
        }
    }

    // ========================================================================
    // Write acknowledgments
    // ========================================================================

    /// Confirm or roll back the write identified by `write_id`
    pub fn complete_write(
        &mut self,
        order_id: &str,
        write_id: WriteId,
        result: anyhow::Result<()>,
    ) -> WriteOutcome {
        if self
            .detached
            .get(order_id)
            .is_some_and(|d| d.write_id == write_id)
        {
            return self.complete_detached(order_id, result);
        }

        // an earlier write may be acknowledged while a finalization is in flight
        let held = match self.detached.get_mut(order_id) {
            Some(detached) => Some(&mut detached.prior),
            None => self.store.get_mut(order_id),
        };
        if let Some(entry) = held.filter(|entry| entry.sync.holds(write_id)) {
            return settle(order_id, write_id, entry, result);
        }
        self.superseded_or_unknown(order_id, result)
    }

    fn complete_detached(&mut self, order_id: &str, result: anyhow::Result<()>) -> WriteOutcome {
        let Some(detached) = self.detached.remove(order_id) else {
            return WriteOutcome::Unknown;
        };

        match result {
            Ok(()) => match detached.kind {
                DetachKind::Finalize => {
                    self.ledger
                        .record(order_id, Tombstone::finalized(&detached.order));
                    tracing::info!(order_id = %order_id, status = %detached.order.status, "Order finalized");
                    WriteOutcome::Finalized(detached.order)
                }
                DetachKind::Delete => {
                    self.ledger.record(order_id, Tombstone::deleted());
                    tracing::info!(order_id = %order_id, "Order deleted");
                    WriteOutcome::Discarded(detached.order)
                }
            },
            // our write lost, but the order did reach a terminal state
            Err(error) if detached.finalized_remotely => {
                tracing::warn!(order_id = %order_id, error = %error, "Write failed but order was finalized remotely");
                WriteOutcome::Finalized(detached.order)
            }
            Err(error) if self.ledger.contains(order_id) => {
                tracing::warn!(order_id = %order_id, error = %error, "Write failed but order was already removed remotely");
                WriteOutcome::Superseded {
                    order_id: order_id.to_string(),
                    error: Some(error),
                }
            }
            Err(error) => {
                let restored = detached.prior.order.clone();
                self.store.put(detached.prior);
                tracing::warn!(order_id = %order_id, error = %error, "Write failed, order restored to the board");
                WriteOutcome::Reverted {
                    order_id: order_id.to_string(),
                    restored,
                    error,
                }
            }
        }
    }

    fn superseded_or_unknown(&self, order_id: &str, result: anyhow::Result<()>) -> WriteOutcome {
        if self.ledger.contains(order_id) || !self.store.contains(order_id) {
            tracing::debug!(order_id = %order_id, "Write acknowledged for an order no longer on the board");
            WriteOutcome::Superseded {
                order_id: order_id.to_string(),
                error: result.err(),
            }
        } else {
            WriteOutcome::Unknown
        }
    }

    // ========================================================================
    // Remote events
    // ========================================================================

    /// Apply one change-feed event
    pub fn apply_remote_event(&mut self, event: &ChangeEvent) -> RemoteOutcome {
        let Some(snapshot) = event.subject() else {
            tracing::warn!(kind = %event.kind, "Change event without a snapshot");
            return RemoteOutcome::Ignored;
        };

        match event.kind {
            ChangeKind::Delete => self.remove_remote(&snapshot.order_id, Tombstone::deleted()),
            ChangeKind::Insert | ChangeKind::Update if snapshot.is_finalized() => {
                self.finalize_remote(snapshot)
            }
            ChangeKind::Insert => self.insert_remote(snapshot),
            ChangeKind::Update => self.update_remote(snapshot),
        }
    }

    fn insert_remote(&mut self, snapshot: &OrderSnapshot) -> RemoteOutcome {
        let id = &snapshot.order_id;
        if self.ledger.contains(id) || self.detached.contains_key(id) {
            return RemoteOutcome::Ignored;
        }
        if self.store.insert_new(TrackedOrder::confirmed(snapshot.clone())) {
            RemoteOutcome::Inserted(id.clone())
        } else {
            tracing::debug!(order_id = %id, "Duplicate insert ignored");
            RemoteOutcome::Ignored
        }
    }

    fn update_remote(&mut self, snapshot: &OrderSnapshot) -> RemoteOutcome {
        let id = &snapshot.order_id;
        if self.ledger.contains(id) {
            tracing::debug!(order_id = %id, "Stale update for a finalized order ignored");
            return RemoteOutcome::Ignored;
        }
        if let Some(detached) = self.detached.get_mut(id) {
            detached.prior.merge_remote(snapshot);
            return RemoteOutcome::Ignored;
        }
        match self.store.get_mut(id) {
            Some(entry) => {
                entry.merge_remote(snapshot);
                RemoteOutcome::Merged(id.clone())
            }
            None => {
                tracing::info!(order_id = %id, "Update for an untracked order, refetch required");
                RemoteOutcome::Gap(id.clone())
            }
        }
    }

    fn finalize_remote(&mut self, snapshot: &OrderSnapshot) -> RemoteOutcome {
        let id = &snapshot.order_id;

        if let Some(detached) = self.detached.get_mut(id) {
            // our own optimistic values were stamped first; the pending ack
            // reports the finalization
            detached.order.merge_remote(snapshot);
            detached.finalized_remotely = true;
            self.ledger.record(id, Tombstone::finalized(&detached.order));
            return RemoteOutcome::Ignored;
        }

        match self.store.remove(id) {
            Some(entry) => {
                let mut order = entry.order;
                order.merge_remote(snapshot);
                self.ledger.record(id, Tombstone::finalized(&order));
                tracing::info!(order_id = %id, status = %order.status, "Order finalized remotely");
                RemoteOutcome::Finalized(order)
            }
            None => {
                self.ledger.record(id, Tombstone::finalized(snapshot));
                RemoteOutcome::Ignored
            }
        }
    }

    fn remove_remote(&mut self, order_id: &str, tombstone: Tombstone) -> RemoteOutcome {
        self.ledger.record(order_id, tombstone);
        match self.store.remove(order_id) {
            Some(_) => {
                tracing::debug!(order_id = %order_id, "Order deleted remotely");
                RemoteOutcome::Removed(order_id.to_string())
            }
            None => RemoteOutcome::Ignored,
        }
    }

    // ========================================================================
    // Full refetch
    // ========================================================================

    /// Replace the working set with a freshly fetched active set.
    ///
    /// Orders with in-flight writes keep their speculative fields; tombstoned
    /// and detached orders stay off the board. Returns the number of orders
    /// dropped because the backing store no longer lists them as active.
    pub fn replace_active(&mut self, fetched: Vec<OrderSnapshot>) -> usize {
        let mut previous: HashMap<String, TrackedOrder> = self.store.drain().collect();

        for snapshot in fetched {
            let id = snapshot.order_id.clone();
            if snapshot.is_finalized() || self.ledger.contains(&id) {
                continue;
            }
            if let Some(detached) = self.detached.get_mut(&id) {
                detached.prior.merge_remote(&snapshot);
                continue;
            }
            match previous.remove(&id) {
                Some(mut entry) => {
                    entry.merge_remote(&snapshot);
                    self.store.put(entry);
                }
                None => self.store.put(TrackedOrder::confirmed(snapshot)),
            }
        }

        let dropped = previous.len();
        if dropped > 0 {
            tracing::info!(dropped, "Orders no longer active after refetch");
        }
        dropped
    }
}

/// Confirm or revert one write held by `entry`
fn settle(
    order_id: &str,
    write_id: WriteId,
    entry: &mut TrackedOrder,
    result: anyhow::Result<()>,
) -> WriteOutcome {
    match result {
        Ok(()) => match entry.confirm(write_id) {
            Some(patch) => {
                tracing::debug!(order_id = %order_id, write_id = %write_id, "Write confirmed");
                WriteOutcome::Confirmed {
                    order_id: order_id.to_string(),
                    patch,
                }
            }
            None => WriteOutcome::Unknown,
        },
        Err(error) => {
            if !entry.revert(write_id) {
                return WriteOutcome::Unknown;
            }
            tracing::warn!(order_id = %order_id, write_id = %write_id, error = %error, "Write failed, optimistic change reverted");
            WriteOutcome::Reverted {
                order_id: order_id.to_string(),
                restored: entry.order.clone(),
                error,
            }
        }
    }
}
