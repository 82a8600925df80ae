//! In-memory collaborators
//!
//! A complete in-process backend for the demo binary and tests. Every write
//! to [`MemoryOrderStore`] is echoed on its change feed, the way a real
//! push-based store reports changes back to the client that made them.

use crate::backend::{ChangeFeed, FeedSubscription, Notice, NoticeLevel, Notifier, OrderRepository, TableService};
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::models::DiningTable;
use shared::order::{ChangeEvent, OrderPatch, OrderSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

const FEED_CAPACITY: usize = 1024;
const SUBSCRIBER_BUFFER: usize = 256;

#[derive(Debug, Clone)]
struct StoredOrder {
    scope_id: String,
    order: OrderSnapshot,
}

#[derive(Debug, Default)]
struct StoreState {
    orders: HashMap<String, StoredOrder>,
    fail_writes: usize,
    writes: usize,
}

/// Order store with a scoped change feed
#[derive(Clone)]
pub struct MemoryOrderStore {
    state: Arc<Mutex<StoreState>>,
    feed: broadcast::Sender<(String, ChangeEvent)>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            feed,
        }
    }

    /// Create an order (capture flow) and publish its insert
    pub fn insert(&self, scope_id: &str, order: OrderSnapshot) {
        self.state.lock().orders.insert(
            order.order_id.clone(),
            StoredOrder {
                scope_id: scope_id.to_string(),
                order: order.clone(),
            },
        );
        self.publish(scope_id, ChangeEvent::insert(order));
    }

    /// Overwrite an order as another client would, publishing an update
    pub fn replace(&self, scope_id: &str, order: OrderSnapshot) {
        let before = self
            .state
            .lock()
            .orders
            .insert(
                order.order_id.clone(),
                StoredOrder {
                    scope_id: scope_id.to_string(),
                    order: order.clone(),
                },
            )
            .map(|stored| stored.order);
        self.publish(scope_id, ChangeEvent::update(before, order));
    }

    /// Push a raw event without touching stored data
    pub fn publish(&self, scope_id: &str, event: ChangeEvent) {
        // no receivers is fine
        let _ = self.feed.send((scope_id.to_string(), event));
    }

    pub fn get(&self, order_id: &str) -> Option<OrderSnapshot> {
        self.state
            .lock()
            .orders
            .get(order_id)
            .map(|stored| stored.order.clone())
    }

    /// Make the next `count` update/delete calls fail
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }

    /// Update/delete calls received, failed ones included
    pub fn write_calls(&self) -> usize {
        self.state.lock().writes
    }

    /// Live feed subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.feed.receiver_count()
    }

    fn begin_write(&self, state: &mut StoreState, order_id: &str) -> anyhow::Result<()> {
        state.writes += 1;
        if state.fail_writes > 0 {
            state.fail_writes -= 1;
            bail!("write rejected for order {}", order_id);
        }
        Ok(())
    }
}

impl Default for MemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderStore {
    async fn fetch_active_orders(&self, scope_id: &str) -> anyhow::Result<Vec<OrderSnapshot>> {
        let state = self.state.lock();
        Ok(state
            .orders
            .values()
            .filter(|stored| stored.scope_id == scope_id && stored.order.is_active())
            .map(|stored| stored.order.clone())
            .collect())
    }

    async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> anyhow::Result<()> {
        let (scope_id, event) = {
            let mut state = self.state.lock();
            self.begin_write(&mut state, order_id)?;
            let stored = state
                .orders
                .get_mut(order_id)
                .ok_or_else(|| anyhow!("order {} not found", order_id))?;
            let before = stored.order.clone();
            patch.apply_to(&mut stored.order);
            stored.order.updated_at += 1;
            (
                stored.scope_id.clone(),
                ChangeEvent::update(Some(before), stored.order.clone()),
            )
        };
        self.publish(&scope_id, event);
        Ok(())
    }

    async fn delete_order(&self, order_id: &str) -> anyhow::Result<()> {
        let removed = {
            let mut state = self.state.lock();
            self.begin_write(&mut state, order_id)?;
            state.orders.remove(order_id)
        };
        // deleting a missing order is not an error
        if let Some(stored) = removed {
            self.publish(&stored.scope_id, ChangeEvent::delete(stored.order));
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeFeed for MemoryOrderStore {
    async fn subscribe(&self, scope_id: &str) -> anyhow::Result<FeedSubscription> {
        let mut source = self.feed.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let token = CancellationToken::new();
        let stop = token.clone();
        let scope_id = scope_id.to_string();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    msg = source.recv() => match msg {
                        Ok((scope, event)) if scope == scope_id => {
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Change feed subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
            tracing::debug!(scope_id = %scope_id, "Change feed forwarder stopped");
        });

        Ok(FeedSubscription::new(rx, token))
    }
}

#[derive(Debug, Default)]
struct TablesState {
    tables: HashMap<String, DiningTable>,
    release_calls: HashMap<String, usize>,
    failing: bool,
}

/// Table registry with release call counting
#[derive(Clone, Default)]
pub struct MemoryTables {
    state: Arc<Mutex<TablesState>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, table: DiningTable) {
        self.state.lock().tables.insert(table.id.clone(), table);
    }

    /// Seat an order. Returns false for an unknown table.
    pub fn occupy(&self, table_id: &str, order_id: &str) -> bool {
        match self.state.lock().tables.get_mut(table_id) {
            Some(table) => {
                table.occupy(order_id);
                true
            }
            None => false,
        }
    }

    pub fn table(&self, table_id: &str) -> Option<DiningTable> {
        self.state.lock().tables.get(table_id).cloned()
    }

    /// Make every release call fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn release_calls(&self, table_id: &str) -> usize {
        self.state
            .lock()
            .release_calls
            .get(table_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_release_calls(&self) -> usize {
        self.state.lock().release_calls.values().sum()
    }
}

#[async_trait]
impl TableService for MemoryTables {
    async fn release_table(&self, table_id: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        *state.release_calls.entry(table_id.to_string()).or_default() += 1;
        if state.failing {
            bail!("table service unavailable");
        }
        let table = state
            .tables
            .get_mut(table_id)
            .ok_or_else(|| anyhow!("table {} not found", table_id))?;
        if !table.release() {
            tracing::debug!(table_id = %table_id, "Table already free");
        }
        Ok(())
    }
}

/// Notifier that keeps every notice
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn errors(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.notices.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}
