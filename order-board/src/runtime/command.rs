//! Messages into the board runtime

use crate::error::{BoardResult, TransitionError};
use crate::store::WriteId;
use shared::order::{OrderSnapshot, OrderStatus};
use tokio::sync::oneshot;

/// Request from a [`BoardHandle`](super::BoardHandle)
#[derive(Debug)]
pub(crate) enum BoardCommand {
    Transition {
        order_id: String,
        target: OrderStatus,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
    TogglePaid {
        order_id: String,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
    Discard {
        order_id: String,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
    Adopt {
        order: Box<OrderSnapshot>,
        reply: oneshot::Sender<Result<bool, TransitionError>>,
    },
    Refresh {
        reply: oneshot::Sender<BoardResult<usize>>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<OrderSnapshot>>,
    },
    /// Reply once no write awaits acknowledgment
    Settled {
        reply: oneshot::Sender<()>,
    },
}

/// Persistence result for one optimistic write
#[derive(Debug)]
pub(crate) struct WriteAck {
    pub order_id: String,
    pub write_id: WriteId,
    pub result: anyhow::Result<()>,
}
