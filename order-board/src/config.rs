//! Board configuration

use std::time::Duration;

/// Order board configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | BOARD_SCOPE_ID | default | scope passed to fetch/subscribe |
/// | BOARD_TICK_INTERVAL_MS | 1000 | elapsed-time tick cadence |
/// | BOARD_COMMAND_BUFFER | 256 | engine inbox capacity |
/// | BOARD_TOMBSTONE_CAPACITY | 4096 | finalized-order ledger size |
/// | BOARD_LOG_LEVEL | info | log level |
/// | BOARD_LOG_DIR | (unset) | rolling log file directory |
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Scope (branch/store) whose orders this board tracks
    pub scope_id: String,
    /// Time source cadence in milliseconds
    pub tick_interval_ms: u64,
    /// Capacity of the command inbox
    pub command_buffer: usize,
    /// How many finalized/deleted order ids to remember
    pub tombstone_capacity: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
}

impl BoardConfig {
    /// Load from environment variables (reads `.env` first if present)
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            scope_id: std::env::var("BOARD_SCOPE_ID").unwrap_or_else(|_| "default".into()),
            tick_interval_ms: std::env::var("BOARD_TICK_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            command_buffer: std::env::var("BOARD_COMMAND_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
            tombstone_capacity: std::env::var("BOARD_TOMBSTONE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4096),
            log_level: std::env::var("BOARD_LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("BOARD_LOG_DIR").ok(),
        }
    }

    /// Defaults without touching the environment
    pub fn new(scope_id: impl Into<String>) -> Self {
        Self {
            scope_id: scope_id.into(),
            tick_interval_ms: 1000,
            command_buffer: 256,
            tombstone_capacity: 4096,
            log_level: "info".into(),
            log_dir: None,
        }
    }

    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }

    pub fn with_tombstone_capacity(mut self, capacity: usize) -> Self {
        self.tombstone_capacity = capacity;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<String>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Tick interval as a Duration (never zero)
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::new("default")
    }
}
