//! Shared handle to the timer store.
//!
//! Every registry access in the daemon (IPC requests and scheduler ticks)
//! goes through [`TimerService`], which holds the one [`TimerStore`] behind
//! an async mutex. Each call locks for exactly one store operation, so
//! updates never interleave. Starting a timer wakes the scheduler.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::store::TimerStore;
use crate::types::{CompletionEvent, Timer, TimerMode};

/// Result of one scheduler step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Timers that completed on this tick
    pub completed: Vec<CompletionEvent>,
    /// Whether any timer is still counting down
    pub still_active: bool,
}

/// Cloneable, mutex-guarded handle to the timer store.
#[derive(Clone)]
pub struct TimerService {
    store: Arc<Mutex<TimerStore>>,
    wake: Arc<Notify>,
}

impl TimerService {
    /// Wraps an opened store.
    pub fn new(store: TimerStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Creates or re-arms a timer.
    pub async fn create_timer(
        &self,
        id: &str,
        mode: TimerMode,
        duration: Option<u32>,
        label: Option<String>,
    ) -> Timer {
        self.store
            .lock()
            .await
            .create_timer(id, mode, duration, label)
    }

    /// Starts the timer and arms the scheduler if it is now running.
    pub async fn start_timer(&self, id: &str) -> Option<Timer> {
        let timer = self.store.lock().await.start_timer(id);
        if timer.as_ref().is_some_and(|t| t.is_active) {
            debug!("Waking scheduler for timer '{}'", id);
            self.wake.notify_one();
        }
        timer
    }

    /// Pauses the timer, keeping its remaining time.
    pub async fn pause_timer(&self, id: &str) -> Option<Timer> {
        self.store.lock().await.pause_timer(id)
    }

    /// Resets the timer to its full (or new) duration.
    pub async fn reset_timer(&self, id: &str, new_duration: Option<u32>) -> Option<Timer> {
        self.store.lock().await.reset_timer(id, new_duration)
    }

    /// Replaces the timer's label.
    pub async fn set_timer_label(&self, id: &str, label: String) -> Option<Timer> {
        self.store.lock().await.set_timer_label(id, label)
    }

    /// Removes the timer.
    pub async fn delete_timer(&self, id: &str) -> Option<Timer> {
        self.store.lock().await.delete_timer(id)
    }

    /// Returns a copy of one timer.
    pub async fn get_timer(&self, id: &str) -> Option<Timer> {
        self.store.lock().await.get_timer(id)
    }

    /// Returns all timers sorted by id.
    pub async fn timers(&self) -> Vec<Timer> {
        self.store.lock().await.timers()
    }

    /// Returns true if any timer is running.
    pub async fn has_active(&self) -> bool {
        self.store.lock().await.has_active()
    }

    /// Runs one tick under the lock.
    pub async fn tick(&self) -> TickOutcome {
        let mut store = self.store.lock().await;
        let completed = store.tick();
        TickOutcome {
            completed,
            still_active: store.has_active(),
        }
    }

    /// Resolves once at least one timer is active.
    ///
    /// A start that happens between the check and the wait leaves a permit
    /// on the notifier, so the wake-up is not lost.
    pub async fn wait_for_active(&self) {
        loop {
            if self.has_active().await {
                return;
            }
            self.wake.notified().await;
        }
    }

    /// Writes the final snapshot.
    pub async fn close(&self) {
        self.store.lock().await.flush();
        debug!("Timer service closed");
    }
}
