//! Shared types for the order board
//!
//! Data model, change-feed events and the unified error code system used by
//! the board engine and every collaborator that talks to it.

pub mod error;
pub mod models;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ErrorCategory, ErrorCode};
pub use order::{ChangeEvent, ChangeKind, OrderPatch, OrderSnapshot, OrderStatus};
