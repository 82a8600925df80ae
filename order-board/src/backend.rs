//! External collaborators
//!
//! The engine only knows these traits. Persistence, the change feed, table
//! management and the notification sink are pluggable; their errors are
//! opaque to the engine and carried as [`anyhow::Error`].

use async_trait::async_trait;
use serde::Serialize;
use shared::error::ErrorCode;
use shared::order::{ChangeEvent, OrderPatch, OrderSnapshot};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Persistence read/write API for orders
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Orders in non-finalized statuses for the scope
    async fn fetch_active_orders(&self, scope_id: &str) -> anyhow::Result<Vec<OrderSnapshot>>;

    /// Partial-field update
    async fn update_order(&self, order_id: &str, patch: &OrderPatch) -> anyhow::Result<()>;

    async fn delete_order(&self, order_id: &str) -> anyhow::Result<()>;
}

/// Push-based change feed on the order collection
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Start delivering events for `scope_id`
    async fn subscribe(&self, scope_id: &str) -> anyhow::Result<FeedSubscription>;
}

/// Table management API
#[async_trait]
pub trait TableService: Send + Sync {
    /// Free a table. Releasing an already free table must succeed.
    async fn release_table(&self, table_id: &str) -> anyhow::Result<()>;
}

/// Fire-and-forget user feedback sink. Must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// An active feed subscription
///
/// Events arrive in publication order. Cancelling the token (via
/// [`FeedSubscription::unsubscribe`] or drop) tells the producer to stop.
pub struct FeedSubscription {
    events: mpsc::Receiver<ChangeEvent>,
    token: CancellationToken,
}

impl FeedSubscription {
    pub fn new(events: mpsc::Receiver<ChangeEvent>, token: CancellationToken) -> Self {
        Self { events, token }
    }

    /// Next event, or `None` once the feed is closed or unsubscribed
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            _ = self.token.cancelled() => None,
            event = self.events.recv() => event,
        }
    }

    /// Stop delivery. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            self.events.close();
            tracing::debug!("Change feed unsubscribed");
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible feedback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            code: None,
            message: message.into(),
        }
    }

    pub fn warning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Notifier that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        let code = notice.code.map(|c| c.to_string()).unwrap_or_default();
        let category = notice.code.map(|c| c.category().name()).unwrap_or_default();
        let reason = notice.code.map(|c| c.message()).unwrap_or_default();
        match notice.level {
            NoticeLevel::Info => tracing::info!(message = %notice.message, "Notice"),
            NoticeLevel::Warning => {
                tracing::warn!(%code, category, reason, message = %notice.message, "Notice")
            }
            NoticeLevel::Error => {
                tracing::error!(%code, category, reason, message = %notice.message, "Notice")
            }
        }
    }
}
