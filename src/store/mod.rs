//! Persistent registry of named timers.
//!
//! [`TimerStore`] owns every timer in the process. It is opened once with an
//! injected [`SnapshotStore`] and [`Clock`], recomputes active timers from
//! wall-clock time on load, persists the full snapshot after every
//! mutation, and produces one [`CompletionEvent`] per timer that reaches
//! zero on a tick.
//!
//! The store itself is synchronous and single-owner; the daemon wraps it in
//! a mutex (see `daemon::service`) so that operations and ticks never
//! interleave.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use dashtimer::store::{ManualClock, MemoryStore, StoreConfig, TimerStore};
//! use dashtimer::types::TimerMode;
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let mut store = TimerStore::open(Box::new(MemoryStore::new()), clock, StoreConfig::default());
//!
//! store.create_timer("pomodoro-1", TimerMode::Work, Some(2), None);
//! store.start_timer("pomodoro-1");
//! assert!(store.tick().is_empty());
//! assert_eq!(store.tick().len(), 1);
//! assert!(!store.has_active());
//! ```

mod clock;
mod error;
mod persistence;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::PersistenceError;
pub use persistence::{JsonFileStore, MemoryStore, SnapshotStore};

use crate::types::{CompletionEvent, Snapshot, Timer, TimerMode};

// ============================================================================
// StoreConfig
// ============================================================================

/// Default pomodoro work session, in seconds.
pub const DEFAULT_WORK_SECS: u32 = 25 * 60;

/// Default pomodoro break, in seconds.
pub const DEFAULT_BREAK_SECS: u32 = 5 * 60;

/// Fallback durations used when a caller creates a timer without a valid
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default duration of work timers in seconds
    pub default_work_secs: u32,
    /// Default duration of break timers in seconds
    pub default_break_secs: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_work_secs: DEFAULT_WORK_SECS,
            default_break_secs: DEFAULT_BREAK_SECS,
        }
    }
}

impl StoreConfig {
    /// Returns the default duration for `mode`, never zero.
    pub fn default_for(&self, mode: TimerMode) -> u32 {
        let secs = match mode {
            TimerMode::Work => self.default_work_secs,
            TimerMode::Break => self.default_break_secs,
        };
        secs.max(1)
    }

    /// Picks `requested` when it is a positive duration, else the mode default.
    pub fn resolve_duration(&self, mode: TimerMode, requested: Option<u32>) -> u32 {
        requested
            .filter(|secs| *secs > 0)
            .unwrap_or_else(|| self.default_for(mode))
    }
}

// ============================================================================
// TimerStore
// ============================================================================

/// Registry of named timers with write-through persistence.
pub struct TimerStore {
    registry: HashMap<String, Timer>,
    persistence: Box<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    config: StoreConfig,
}

impl TimerStore {
    /// Opens the store, loading and drift-correcting the persisted snapshot.
    ///
    /// A missing, unreadable or corrupt snapshot yields an empty registry;
    /// the failure is logged and never returned.
    pub fn open(
        persistence: Box<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        config: StoreConfig,
    ) -> Self {
        let snapshot = match persistence.load() {
            Ok(snapshot) => snapshot.unwrap_or_default(),
            Err(e) => {
                warn!("Starting with no timers, snapshot could not be loaded: {}", e);
                Snapshot::new()
            }
        };

        let now = clock.now_ms();
        let loaded = snapshot.len();
        let mut changed = false;
        let mut registry = HashMap::with_capacity(loaded);

        for (id, record) in snapshot {
            let Some(mut timer) = record.clone().normalized(&id) else {
                warn!("Dropping timer '{}' with zero total time", id);
                changed = true;
                continue;
            };
            changed |= timer != record;
            if timer.catch_up(now) {
                changed = true;
                debug!(
                    "Timer '{}' caught up to {}s left (active: {})",
                    id, timer.time_left, timer.is_active
                );
            }
            registry.insert(id, timer);
        }

        info!("Timer store opened with {} timer(s)", registry.len());

        let store = Self {
            registry,
            persistence,
            clock,
            config,
        };
        if changed {
            store.persist();
        }
        store
    }

    /// Creates or fully replaces the timer `id`.
    ///
    /// A missing or zero `duration` falls back to the configured default for
    /// `mode`.
    pub fn create_timer(
        &mut self,
        id: &str,
        mode: TimerMode,
        duration: Option<u32>,
        label: Option<String>,
    ) -> Timer {
        let duration = self.config.resolve_duration(mode, duration);
        let timer = Timer::new(id, mode, duration, label);
        debug!("Creating {} timer '{}' for {}s", mode, id, duration);
        self.registry.insert(id.to_string(), timer.clone());
        self.persist();
        timer
    }

    /// Starts counting the timer down from now.
    ///
    /// Unknown ids and timers with nothing left are ignored. Returns the
    /// updated timer when it exists.
    pub fn start_timer(&mut self, id: &str) -> Option<Timer> {
        let now = self.clock.now_ms();
        let timer = self.registry.get_mut(id)?;
        if !timer.start(now) {
            debug!("Timer '{}' has no time left, not starting", id);
            return Some(timer.clone());
        }
        let timer = timer.clone();
        self.persist();
        Some(timer)
    }

    /// Stops the countdown without consuming any time.
    pub fn pause_timer(&mut self, id: &str) -> Option<Timer> {
        let timer = self.registry.get_mut(id)?;
        timer.pause();
        let timer = timer.clone();
        self.persist();
        Some(timer)
    }

    /// Re-arms the timer with `new_duration`, or its current total time.
    pub fn reset_timer(&mut self, id: &str, new_duration: Option<u32>) -> Option<Timer> {
        let timer = self.registry.get_mut(id)?;
        let duration = new_duration
            .filter(|secs| *secs > 0)
            .unwrap_or(timer.total_time);
        timer.reset(duration);
        let timer = timer.clone();
        self.persist();
        Some(timer)
    }

    /// Replaces the label; run state is untouched.
    pub fn set_timer_label(&mut self, id: &str, label: impl Into<String>) -> Option<Timer> {
        let timer = self.registry.get_mut(id)?;
        timer.label = Some(label.into());
        let timer = timer.clone();
        self.persist();
        Some(timer)
    }

    /// Removes the timer, returning its last state.
    pub fn delete_timer(&mut self, id: &str) -> Option<Timer> {
        let removed = self.registry.remove(id)?;
        self.persist();
        Some(removed)
    }

    /// Returns a copy of the timer.
    pub fn get_timer(&self, id: &str) -> Option<Timer> {
        self.registry.get(id).cloned()
    }

    /// Returns copies of all timers, ordered by id.
    pub fn timers(&self) -> Vec<Timer> {
        let mut timers: Vec<Timer> = self.registry.values().cloned().collect();
        timers.sort_by(|a, b| a.id.cmp(&b.id));
        timers
    }

    /// Returns true while at least one timer is counting down.
    pub fn has_active(&self) -> bool {
        self.registry.values().any(|t| t.is_active)
    }

    /// Number of timers in the registry.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns true if the registry holds no timers.
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Advances every active timer by one second.
    ///
    /// Returns one event per timer that reached zero in this step. The
    /// snapshot is persisted only if some timer was active.
    pub fn tick(&mut self) -> Vec<CompletionEvent> {
        let mut touched = false;
        let mut completed = Vec::new();

        for timer in self.registry.values_mut().filter(|t| t.is_active) {
            touched = true;
            if timer.tick() {
                info!("Timer '{}' completed", timer.id);
                completed.push(timer.completion_event());
            }
        }

        if touched {
            self.persist();
        }
        completed
    }

    /// Writes the current snapshot.
    pub fn flush(&self) {
        self.persist();
    }

    /// Writes the final snapshot and releases the store.
    pub fn close(self) {
        self.flush();
        debug!("Timer store closed");
    }

    /// Builds the serializable snapshot of the registry.
    pub fn snapshot(&self) -> Snapshot {
        self.registry
            .iter()
            .map(|(id, timer)| (id.clone(), timer.clone()))
            .collect()
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.snapshot()) {
            error!("Failed to persist timers, keeping in-memory state: {}", e);
        }
    }
}

impl std::fmt::Debug for TimerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerStore")
            .field("timers", &self.registry.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
