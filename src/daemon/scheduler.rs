//! Shared tick loop for all timers.
//!
//! One task drives every timer:
//! - Parked on the service's notifier while no timer is active
//! - Ticking once per second with `tokio::time::interval` while any is
//! - Forwarding completion events to the alarm dispatcher

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::service::TimerService;
use crate::types::CompletionEvent;

/// Scheduler period.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

// ============================================================================
// Scheduler
// ============================================================================

/// Drives the once-per-second countdown of every active timer.
pub struct Scheduler {
    service: TimerService,
    event_tx: mpsc::UnboundedSender<CompletionEvent>,
}

impl Scheduler {
    /// Creates a scheduler that reports completions on `event_tx`.
    pub fn new(service: TimerService, event_tx: mpsc::UnboundedSender<CompletionEvent>) -> Self {
        Self { service, event_tx }
    }

    /// Runs until `shutdown` changes or its sender is dropped.
    ///
    /// The interval exists only while some timer is active; it is torn down
    /// when the last one stops and re-created on the next start.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = self.service.wait_for_active() => {}
                _ = shutdown.changed() => break,
            }

            debug!("Tick loop armed");
            let mut ticker = interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !self.step().await {
                            debug!("No active timers, tick loop disarmed");
                            break;
                        }
                    }
                    _ = shutdown.changed() => {
                        debug!("Scheduler stopped");
                        return;
                    }
                }
            }
        }
        debug!("Scheduler stopped");
    }

    /// Runs one tick. Returns whether the loop should stay armed.
    async fn step(&self) -> bool {
        let outcome = self.service.tick().await;
        for event in outcome.completed {
            if self.event_tx.send(event).is_err() {
                warn!("Alarm dispatcher is gone, completion not announced");
            }
        }
        outcome.still_active
    }
}

// ============================================================================
// Tests
// ============================================================================
