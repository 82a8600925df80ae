//! Order Module
//!
//! Types shared between the board engine and its collaborators:
//! - Snapshots: the order as the backing store reports it
//! - Patches: partial-field writes sent back to the store
//! - Change events: push notifications from the store's change feed

pub mod event;
pub mod snapshot;
pub mod types;

// Re-exports
pub use event::{ChangeEvent, ChangeKind};
pub use snapshot::{OrderPatch, OrderSnapshot, OrderStatus};
pub use types::*;
