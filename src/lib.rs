//! dashtimer library
//!
//! Persistent, drift-corrected countdown timers for dashboard widgets.
//! It includes:
//! - Timer store with write-through JSON persistence and catch-up on load
//! - Shared once-per-second scheduler with idempotent completion
//! - Completion alarms (synthesized bell and desktop notification)
//! - IPC server/client for daemon-CLI communication
//! - CLI command parsing and display utilities

pub mod alarm;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    CompletionEvent, IpcRequest, IpcResponse, ResponseData, Snapshot, Timer, TimerMode,
};

pub use store::{
    Clock, JsonFileStore, ManualClock, MemoryStore, PersistenceError, SnapshotStore, StoreConfig,
    SystemClock, TimerStore,
};

pub use alarm::{
    AlarmChain, AlarmDispatcher, AlarmError, AlarmNotifier, CompletionMessage, DesktopAlarm,
    MockAlarmNotifier, SoundAlarm,
};

pub use config::{ConfigError, DaemonConfig};

pub use daemon::{RequestHandler, Scheduler, TimerService};
