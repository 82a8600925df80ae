//! Board runtime
//!
//! Single task that owns the [`Reconciler`] and serializes every input:
//! caller commands, change-feed events and write acknowledgments. Writes
//! run on their own tasks and report back through the ack channel, so the
//! loop only suspends while refetching the active set.
//!
//! ```text
//! BoardHandle ──commands──┐
//! ChangeFeed ───events────┼──► BoardRuntime ──► Reconciler ──► OrderStore
//! write tasks ──acks──────┤         │
//! Ticker ───────ticks─────┘         ├──► EffectDispatcher (table release)
//!                                   └──► watch<BoardView>
//! ```

mod command;
mod handle;

pub use handle::BoardHandle;

use crate::backend::{ChangeFeed, FeedSubscription, LogNotifier, Notice, Notifier, OrderRepository, TableService};
use crate::clock::{Clock, SystemClock, Ticker};
use crate::config::BoardConfig;
use crate::effects::EffectDispatcher;
use crate::error::{BoardError, BoardResult, TransitionError};
use crate::reconciler::{Reconciler, RemoteOutcome, WriteOp, WriteOutcome, WriteRequest};
use crate::view::BoardView;
use command::{BoardCommand, WriteAck};
use shared::error::ErrorCode;
use shared::order::ChangeEvent;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// External collaborators the board runs against
#[derive(Clone)]
pub struct Collaborators {
    pub repository: Arc<dyn OrderRepository>,
    pub feed: Arc<dyn ChangeFeed>,
    pub tables: Arc<dyn TableService>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    /// Logging notifier and the system clock by default
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        feed: Arc<dyn ChangeFeed>,
        tables: Arc<dyn TableService>,
    ) -> Self {
        Self {
            repository,
            feed,
            tables,
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Subscribe, load the active set and start the runtime.
///
/// The feed is subscribed before the initial fetch so no change between
/// the two is missed; events that overlap the fetch are deduplicated.
pub async fn start(config: BoardConfig, collaborators: Collaborators) -> BoardResult<BoardHandle> {
    let Collaborators {
        repository,
        feed,
        tables,
        notifier,
        clock,
    } = collaborators;

    let subscription = feed
        .subscribe(&config.scope_id)
        .await
        .map_err(BoardError::Feed)?;

    let mut reconciler = Reconciler::new(config.tombstone_capacity);
    let orders = repository
        .fetch_active_orders(&config.scope_id)
        .await
        .map_err(BoardError::Fetch)?;
    reconciler.replace_active(orders);

    let shutdown = CancellationToken::new();
    let ticker = Ticker::spawn(clock.clone(), config.tick_interval(), shutdown.child_token());
    let ticks = ticker.subscribe();
    let (view_tx, view_rx) = watch::channel(BoardView::render(reconciler.store(), ticker.now()));
    let (cmd_tx, cmd_rx) = mpsc::channel(config.command_buffer.max(1));
    let (ack_tx, ack_rx) = mpsc::unbounded_channel();

    tracing::info!(
        scope_id = %config.scope_id,
        orders = reconciler.store().len(),
        "Order board started"
    );

    let runtime = BoardRuntime {
        config,
        reconciler,
        repository,
        effects: EffectDispatcher::new(tables, notifier),
        clock,
        ticker,
        ticks,
        ticking: true,
        feed: subscription,
        feed_open: true,
        commands: cmd_rx,
        ack_tx,
        acks: ack_rx,
        view: view_tx,
        settle_waiters: Vec::new(),
        shutdown: shutdown.clone(),
    };
    let task = tokio::spawn(runtime.run());

    Ok(BoardHandle::new(cmd_tx, view_rx, shutdown, task))
}

struct BoardRuntime {
    config: BoardConfig,
    reconciler: Reconciler,
    repository: Arc<dyn OrderRepository>,
    effects: EffectDispatcher,
    clock: Arc<dyn Clock>,
    ticker: Ticker,
    ticks: watch::Receiver<i64>,
    ticking: bool,
    feed: FeedSubscription,
    feed_open: bool,
    commands: mpsc::Receiver<BoardCommand>,
    ack_tx: mpsc::UnboundedSender<WriteAck>,
    acks: mpsc::UnboundedReceiver<WriteAck>,
    view: watch::Sender<BoardView>,
    settle_waiters: Vec<oneshot::Sender<()>>,
    shutdown: CancellationToken,
}

impl BoardRuntime {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    tracing::info!("Order board shutting down");
                    break;
                }

                Some(ack) = self.acks.recv() => self.on_write_ack(ack),

                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.on_command(cmd).await,
                    None => {
                        tracing::info!("All board handles dropped");
                        break;
                    }
                },

                event = self.feed.recv(), if self.feed_open => match event {
                    Some(event) => self.on_remote_event(event).await,
                    None => {
                        self.feed_open = false;
                        tracing::warn!("Change feed closed, live updates stopped");
                        self.effects.notify(Notice::warning(
                            ErrorCode::NetworkError,
                            "Live order updates stopped",
                        ));
                    }
                },

                changed = self.ticks.changed(), if self.ticking => match changed {
                    Ok(()) => {
                        let now = *self.ticks.borrow_and_update();
                        self.view.send_modify(|view| view.retick(now));
                    }
                    Err(_) => self.ticking = false,
                },
            }
        }

        self.teardown().await;
    }

    async fn on_command(&mut self, cmd: BoardCommand) {
        match cmd {
            BoardCommand::Transition {
                order_id,
                target,
                reply,
            } => {
                let now = self.clock.now_millis();
                let requested = self.reconciler.request_transition(&order_id, target, now);
                let _ = reply.send(self.accept(requested));
            }
            BoardCommand::TogglePaid { order_id, reply } => {
                let requested = self.reconciler.toggle_paid(&order_id);
                let _ = reply.send(self.accept(requested));
            }
            BoardCommand::Discard { order_id, reply } => {
                let requested = self.reconciler.discard(&order_id);
                let _ = reply.send(self.accept(requested));
            }
            BoardCommand::Adopt { order, reply } => {
                let result = self.reconciler.adopt(*order);
                if matches!(result, Ok(true)) {
                    self.publish_view();
                }
                let _ = reply.send(result);
            }
            BoardCommand::Refresh { reply } => {
                let result = self.refetch().await;
                let _ = reply.send(result);
            }
            BoardCommand::Snapshot { reply } => {
                let _ = reply.send(self.reconciler.store().snapshot());
            }
            BoardCommand::Settled { reply } => {
                self.settle_waiters.push(reply);
                self.wake_settled();
            }
        }
    }

    /// Persist an accepted request, or pass a rejection back to the caller
    fn accept(
        &mut self,
        requested: Result<WriteRequest, TransitionError>,
    ) -> Result<(), TransitionError> {
        match requested {
            Ok(request) => {
                self.dispatch_write(request);
                self.publish_view();
                Ok(())
            }
            Err(e) => {
                tracing::info!(code = %e.code(), error = %e, "Request rejected");
                Err(e)
            }
        }
    }

    fn dispatch_write(&self, request: WriteRequest) {
        let repository = self.repository.clone();
        let acks = self.ack_tx.clone();

        tokio::spawn(async move {
            let WriteRequest {
                write_id,
                order_id,
                op,
            } = request;
            let result = match &op {
                WriteOp::Update(patch) => repository.update_order(&order_id, patch).await,
                WriteOp::Delete => repository.delete_order(&order_id).await,
            };
            // receiver gone means the board was torn down
            let _ = acks.send(WriteAck {
                order_id,
                write_id,
                result,
            });
        });
    }

    fn on_write_ack(&mut self, ack: WriteAck) {
        let WriteAck {
            order_id,
            write_id,
            result,
        } = ack;

        match self.reconciler.complete_write(&order_id, write_id, result) {
            WriteOutcome::Confirmed { order_id, patch } => {
                let label = self.label(&order_id);
                let message = match (patch.status, patch.paid) {
                    (Some(status), _) => format!("Order {} is now {}", label, status),
                    (None, Some(true)) => format!("Order {} marked as paid", label),
                    (None, Some(false)) => format!("Order {} marked as unpaid", label),
                    (None, None) => format!("Order {} saved", label),
                };
                self.effects.notify(Notice::info(message));
            }
            WriteOutcome::Finalized(order) => {
                self.effects.on_finalized(&order);
                self.effects.notify(Notice::info(format!(
                    "Order {} is now {}",
                    order.display_number, order.status
                )));
            }
            WriteOutcome::Discarded(order) => {
                self.effects.on_discarded(&order);
                self.effects
                    .notify(Notice::info(format!("Order {} removed", order.display_number)));
            }
            WriteOutcome::Reverted {
                order_id,
                restored,
                error,
            } => {
                let err = BoardError::Persistence {
                    order_id,
                    source: error,
                };
                tracing::error!(code = %err.code(), error = %err, "Optimistic write reverted");
                self.effects.notify(Notice::error(
                    err.code(),
                    format!(
                        "Order {} could not be saved, back to {}",
                        restored.display_number, restored.status
                    ),
                ));
            }
            WriteOutcome::Superseded { order_id, error } => {
                tracing::debug!(order_id = %order_id, failed = error.is_some(), "Write superseded by a remote change");
            }
            WriteOutcome::Unknown => {
                tracing::warn!(order_id = %order_id, write_id = %write_id, "Acknowledgment for an unknown write");
            }
        }

        self.publish_view();
        self.wake_settled();
    }

    async fn on_remote_event(&mut self, event: ChangeEvent) {
        match self.reconciler.apply_remote_event(&event) {
            RemoteOutcome::Gap(order_id) => {
                let gap = BoardError::SubscriptionGap(order_id);
                tracing::warn!(code = %gap.code(), error = %gap, "Change feed gap, refetching active orders");
                // failure is already logged and notified
                let _ = self.refetch().await;
            }
            RemoteOutcome::Finalized(order) => {
                self.effects.on_finalized(&order);
                self.effects.notify(Notice::info(format!(
                    "Order {} is now {}",
                    order.display_number, order.status
                )));
                self.publish_view();
            }
            RemoteOutcome::Inserted(_) | RemoteOutcome::Merged(_) | RemoteOutcome::Removed(_) => {
                self.publish_view();
            }
            RemoteOutcome::Ignored => {}
        }
    }

    /// Replace the working set with a fresh fetch
    async fn refetch(&mut self) -> BoardResult<usize> {
        match self
            .repository
            .fetch_active_orders(&self.config.scope_id)
            .await
        {
            Ok(orders) => {
                let fetched = orders.len();
                let dropped = self.reconciler.replace_active(orders);
                tracing::info!(fetched, dropped, "Active orders refetched");
                self.publish_view();
                self.wake_settled();
                Ok(self.reconciler.store().len())
            }
            Err(source) => {
                let err = BoardError::Fetch(source);
                tracing::error!(code = %err.code(), error = %err, "Refetch failed");
                self.effects
                    .notify(Notice::error(err.code(), "Could not refresh active orders"));
                Err(err)
            }
        }
    }

    fn label(&self, order_id: &str) -> String {
        self.reconciler
            .store()
            .get(order_id)
            .map(|entry| entry.order.display_number.clone())
            .unwrap_or_else(|| order_id.to_string())
    }

    fn publish_view(&self) {
        let now = *self.ticks.borrow();
        self.view
            .send_replace(BoardView::render(self.reconciler.store(), now));
    }

    fn wake_settled(&mut self) {
        if self.reconciler.in_flight() == 0 {
            for waiter in self.settle_waiters.drain(..) {
                let _ = waiter.send(());
            }
        }
    }

    async fn teardown(self) {
        let BoardRuntime {
            reconciler,
            effects,
            ticker,
            mut feed,
            mut commands,
            settle_waiters,
            shutdown,
            ..
        } = self;

        feed.unsubscribe();
        commands.close();
        shutdown.cancel();
        ticker.join().await;

        // pending settle replies resolve as Closed
        drop(settle_waiters);
        let in_flight = reconciler.in_flight();
        if in_flight > 0 {
            tracing::warn!(in_flight, "Shutting down with unacknowledged writes");
        }

        let running = effects.in_progress();
        if running > 0 {
            tracing::info!(running, "Waiting for table releases to finish");
        }
        effects.close_and_wait().await;
        tracing::info!("Order board stopped");
    }
}
