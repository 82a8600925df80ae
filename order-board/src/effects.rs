//! Side-effect dispatcher
//!
//! Runs cleanup that follows a durable finalization (table release) on
//! its own tasks. A failed effect is logged and reported through the
//! notifier; it never reaches back into the order store.

use crate::backend::{Notice, Notifier, TableService};
use crate::error::BoardError;
use shared::order::OrderSnapshot;
use std::sync::Arc;
use tokio_util::task::TaskTracker;

pub struct EffectDispatcher {
    tables: Arc<dyn TableService>,
    notifier: Arc<dyn Notifier>,
    tracker: TaskTracker,
}

impl EffectDispatcher {
    pub fn new(tables: Arc<dyn TableService>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            tables,
            notifier,
            tracker: TaskTracker::new(),
        }
    }

    /// Effects for an order whose finalization was just acknowledged.
    ///
    /// The caller guarantees one call per finalization. Returns whether a
    /// table release was dispatched.
    pub fn on_finalized(&self, order: &OrderSnapshot) -> bool {
        match order.table_ref() {
            Some(table_id) => {
                self.release(table_id, &order.order_id);
                true
            }
            None => false,
        }
    }

    /// Effects for an order deleted before finalization (best-effort release)
    pub fn on_discarded(&self, order: &OrderSnapshot) -> bool {
        self.on_finalized(order)
    }

    pub fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Effects still running
    pub fn in_progress(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every dispatched effect to finish
    pub async fn close_and_wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn release(&self, table_id: &str, order_id: &str) {
        let tables = self.tables.clone();
        let notifier = self.notifier.clone();
        let table_id = table_id.to_string();
        let order_id = order_id.to_string();

        tracing::debug!(table_id = %table_id, order_id = %order_id, "Releasing table");
        self.tracker.spawn(async move {
            match tables.release_table(&table_id).await {
                Ok(()) => {
                    tracing::info!(table_id = %table_id, order_id = %order_id, "Table released");
                }
                Err(source) => {
                    let err = BoardError::SideEffect {
                        table_id: table_id.clone(),
                        source,
                    };
                    tracing::error!(order_id = %order_id, code = %err.code(), error = %err, "Table release failed");
                    notifier.notify(Notice::error(
                        err.code(),
                        format!("Table {} could not be released", table_id),
                    ));
                }
            }
        });
    }
}
