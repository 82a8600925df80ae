//! Order Board - client-side order lifecycle reconciliation
//!
//! Keeps an in-memory working set of active orders consistent with local
//! status changes, a push-based change feed from the backing store, and the
//! elapsed preparation time shown on screen.
//!
//! # Module layout
//!
//! ```text
//! order-board/src/
//! ├── clock.rs       # Clock + fixed-cadence Ticker
//! ├── elapsed.rs     # elapsed time and urgency tiers
//! ├── store.rs       # active set, sync state, finalized ledger
//! ├── reconciler/    # lifecycle state machine
//! ├── effects.rs     # table release after finalization
//! ├── runtime/       # actor loop + BoardHandle
//! ├── view.rs        # read-only projection for the UI
//! ├── backend.rs     # collaborator traits
//! ├── memory.rs      # in-memory collaborators
//! ├── config.rs
//! ├── error.rs
//! └── logger.rs
//! ```
//!
//! # Example
//!
//! ```no_run
//! use order_board::memory::{MemoryOrderStore, MemoryTables};
//! use order_board::{BoardConfig, Collaborators};
//! use shared::order::OrderStatus;
//! use std::sync::Arc;
//!
//! # async fn demo() -> order_board::BoardResult<()> {
//! let store = MemoryOrderStore::new();
//! let collaborators = Collaborators::new(
//!     Arc::new(store.clone()),
//!     Arc::new(store.clone()),
//!     Arc::new(MemoryTables::new()),
//! );
//! let board = order_board::start(BoardConfig::default(), collaborators).await?;
//! board.request_transition("A1", OrderStatus::Preparing).await?;
//! board.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod effects;
pub mod elapsed;
pub mod error;
pub mod logger;
pub mod memory;
pub mod reconciler;
pub mod runtime;
pub mod store;
pub mod view;

// Re-exports
pub use backend::{ChangeFeed, FeedSubscription, Notice, NoticeLevel, Notifier, OrderRepository, TableService};
pub use clock::{Clock, ManualClock, SystemClock, Ticker};
pub use config::BoardConfig;
pub use elapsed::{ElapsedTime, UrgencyTier, elapsed_time};
pub use error::{BoardError, BoardResult, TransitionError};
pub use logger::{init_logger, init_logger_with_file};
pub use reconciler::{Reconciler, RemoteOutcome, WriteOutcome};
pub use runtime::{BoardHandle, Collaborators, start};
pub use view::{BoardView, OrderCard};
