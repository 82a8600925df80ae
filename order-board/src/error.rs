//! Board error types

use shared::error::ErrorCode;
use shared::order::OrderStatus;
use thiserror::Error;

/// Rejected local request. The store is untouched when one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order already finalized: {0}")]
    OrderFinalized(String),

    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl TransitionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TransitionError::OrderNotFound(_) => ErrorCode::OrderNotFound,
            TransitionError::OrderFinalized(_) => ErrorCode::OrderAlreadyFinalized,
            TransitionError::InvalidTransition { .. } => ErrorCode::InvalidTransition,
        }
    }
}

/// Board errors
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] TransitionError),

    #[error("Failed to persist order {order_id}: {source}")]
    Persistence {
        order_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to fetch active orders: {0}")]
    Fetch(#[source] anyhow::Error),

    #[error("Order {0} is not tracked locally")]
    SubscriptionGap(String),

    #[error("Failed to release table {table_id}: {source}")]
    SideEffect {
        table_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Change feed error: {0}")]
    Feed(#[source] anyhow::Error),

    #[error("Order board is closed")]
    Closed,
}

impl BoardError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BoardError::Validation(e) => e.code(),
            BoardError::Persistence { .. } => ErrorCode::OrderWriteFailed,
            BoardError::Fetch(_) => ErrorCode::DatabaseError,
            BoardError::SubscriptionGap(_) => ErrorCode::SubscriptionGap,
            BoardError::SideEffect { .. } => ErrorCode::TableReleaseFailed,
            BoardError::Feed(_) => ErrorCode::NetworkError,
            BoardError::Closed => ErrorCode::BoardClosed,
        }
    }

    /// Whether the caller should see this synchronously
    pub fn is_validation(&self) -> bool {
        matches!(self, BoardError::Validation(_))
    }
}

pub type BoardResult<T> = Result<T, BoardError>;
