//! Caller-side handle to a running board

use super::command::BoardCommand;
use crate::error::{BoardError, BoardResult};
use crate::view::BoardView;
use parking_lot::Mutex;
use shared::order::{OrderSnapshot, OrderStatus};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle to a running order board
///
/// Cheap to clone. Every mutation goes through the runtime's inbox, so
/// requests from all clones are applied one at a time in arrival order.
/// Validation errors come back synchronously; persistence and side-effect
/// failures are reported through the notifier.
#[derive(Clone)]
pub struct BoardHandle {
    commands: mpsc::Sender<BoardCommand>,
    view: watch::Receiver<BoardView>,
    shutdown: CancellationToken,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BoardHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<BoardCommand>,
        view: watch::Receiver<BoardView>,
        shutdown: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            commands,
            view,
            shutdown,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> BoardCommand,
    ) -> BoardResult<T> {
        if self.shutdown.is_cancelled() {
            return Err(BoardError::Closed);
        }
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| BoardError::Closed)?;
        rx.await.map_err(|_| BoardError::Closed)
    }

    /// Move an order to `target`.
    ///
    /// Returns once the change is applied optimistically; the write is
    /// confirmed or reverted later.
    pub async fn request_transition(&self, order_id: &str, target: OrderStatus) -> BoardResult<()> {
        let order_id = order_id.to_string();
        Ok(self
            .request(|reply| BoardCommand::Transition {
                order_id,
                target,
                reply,
            })
            .await??)
    }

    pub async fn toggle_paid(&self, order_id: &str) -> BoardResult<()> {
        let order_id = order_id.to_string();
        Ok(self
            .request(|reply| BoardCommand::TogglePaid { order_id, reply })
            .await??)
    }

    pub async fn discard(&self, order_id: &str) -> BoardResult<()> {
        let order_id = order_id.to_string();
        Ok(self
            .request(|reply| BoardCommand::Discard { order_id, reply })
            .await??)
    }

    /// Track an order just created by the capture flow.
    ///
    /// `Ok(false)` if the board already had it (e.g. the feed was faster).
    pub async fn adopt(&self, order: OrderSnapshot) -> BoardResult<bool> {
        Ok(self
            .request(|reply| BoardCommand::Adopt {
                order: Box::new(order),
                reply,
            })
            .await??)
    }

    /// Refetch the active set. Returns how many orders are on the board.
    pub async fn refresh(&self) -> BoardResult<usize> {
        self.request(|reply| BoardCommand::Refresh { reply }).await?
    }

    /// Active orders, oldest first
    pub async fn snapshot(&self) -> BoardResult<Vec<OrderSnapshot>> {
        self.request(|reply| BoardCommand::Snapshot { reply }).await
    }

    /// Wait until every optimistic write has been confirmed or reverted
    pub async fn settled(&self) -> BoardResult<()> {
        self.request(|reply| BoardCommand::Settled { reply }).await
    }

    /// Latest rendered view
    pub fn view(&self) -> BoardView {
        self.view.borrow().clone()
    }

    /// Receiver updated on every mutation and tick
    pub fn subscribe_view(&self) -> watch::Receiver<BoardView> {
        self.view.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop the feed subscription, the ticker and the runtime loop.
    ///
    /// Waits for running side effects. Nothing is applied to the board
    /// after this returns. Later calls return immediately.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "Board runtime task failed");
        }
    }
}
