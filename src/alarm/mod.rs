//! Completion alarms for the dashboard timers.
//!
//! When a timer reaches zero the store emits a [`CompletionEvent`]. This
//! module turns it into a human-readable message and hands it to an
//! [`AlarmNotifier`]:
//!
//! - [`SoundAlarm`]: synthesized bell through rodio
//! - [`DesktopAlarm`]: desktop notification through notify-rust
//! - [`AlarmChain`]: fans out to several notifiers
//! - [`MockAlarmNotifier`]: records calls for tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  CompletionEvent  ┌─────────────────┐  spawn_blocking  ┌───────────────┐
//! │  Scheduler   │──────────────────▶│ AlarmDispatcher │─────────────────▶│ AlarmNotifier │
//! └──────────────┘   (unbounded)     └─────────────────┘                  └───────────────┘
//! ```
//!
//! Notifiers block (audio playback, D-Bus round trips), so the dispatcher
//! runs each one on a blocking worker and never awaits it. Failures are
//! logged and dropped.

mod desktop;
mod error;
mod sound;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use desktop::DesktopAlarm;
pub use error::AlarmError;
pub use sound::{bell_pattern, try_create_sound_alarm, SoundAlarm, Tone, DEFAULT_VOLUME};

use crate::config::DaemonConfig;
use crate::types::{CompletionEvent, TimerMode};

/// Capability that alerts the user when a timer completes.
///
/// Implementations must tolerate a missing device or notification server
/// by returning an error; they must never panic.
pub trait AlarmNotifier: Send + Sync {
    /// Plays an audible cue and/or raises a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the alert could not be delivered.
    fn notify_completion(&self, title: &str, body: &str) -> Result<(), AlarmError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

// ============================================================================
// CompletionMessage
// ============================================================================

/// Title and body shown for a completed timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMessage {
    pub title: String,
    pub body: String,
}

impl CompletionMessage {
    /// Derives the message from the timer's mode and label.
    pub fn from_event(event: &CompletionEvent) -> Self {
        let (title, fallback) = match event.mode {
            TimerMode::Work => ("⏰ Focus session complete!", "Time for a break"),
            TimerMode::Break => ("☕ Break is over!", "Ready to focus again?"),
        };
        let body = event
            .label
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .unwrap_or(fallback);
        Self {
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

// ============================================================================
// AlarmChain
// ============================================================================

/// Notifier that calls every inner notifier in order.
///
/// All notifiers are attempted even if one fails; the first failure is
/// returned. An empty chain is a silent no-op.
#[derive(Default, Clone)]
pub struct AlarmChain {
    notifiers: Vec<Arc<dyn AlarmNotifier>>,
}

impl AlarmChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a notifier to the chain.
    #[must_use]
    pub fn with(mut self, notifier: Arc<dyn AlarmNotifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Number of notifiers in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    /// Returns true if the chain has no notifiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl AlarmNotifier for AlarmChain {
    fn notify_completion(&self, title: &str, body: &str) -> Result<(), AlarmError> {
        let mut first_error = None;
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify_completion(title, body) {
                warn!("{} alarm failed: {}", notifier.name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for AlarmChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.notifiers.iter().map(|n| n.name()).collect();
        f.debug_struct("AlarmChain").field("notifiers", &names).finish()
    }
}

/// Builds the notifier chain described by the daemon configuration.
///
/// Unavailable audio is logged and skipped.
pub fn build_notifier(config: &DaemonConfig) -> AlarmChain {
    let mut chain = AlarmChain::new();
    if config.sound {
        if let Some(alarm) = try_create_sound_alarm(config.alarm_volume) {
            chain = chain.with(alarm);
        }
    }
    if config.desktop_notifications {
        chain = chain.with(Arc::new(DesktopAlarm::new()));
    }
    debug!("Alarm notifiers: {:?}", chain);
    chain
}

// ============================================================================
// AlarmDispatcher
// ============================================================================

/// Consumes completion events and fires the notifier without blocking.
pub struct AlarmDispatcher {
    notifier: Arc<dyn AlarmNotifier>,
}

impl AlarmDispatcher {
    /// Creates a dispatcher around `notifier`.
    pub fn new(notifier: Arc<dyn AlarmNotifier>) -> Self {
        Self { notifier }
    }

    /// Dispatches events until every sender is dropped.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<CompletionEvent>) {
        while let Some(event) = events.recv().await {
            // Detached: the handle is only useful to tests.
            drop(self.dispatch(&event));
        }
        debug!("Alarm dispatcher stopped");
    }

    /// Fires the notifier for one event on a blocking worker.
    pub fn dispatch(&self, event: &CompletionEvent) -> JoinHandle<()> {
        info!("Timer '{}' ({}) complete, raising alarm", event.id, event.mode);
        let message = CompletionMessage::from_event(event);
        let notifier = Arc::clone(&self.notifier);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = notifier.notify_completion(&message.title, &message.body) {
                warn!("Completion alarm failed: {}", e);
            }
        })
    }
}

// ============================================================================
// MockAlarmNotifier
// ============================================================================

/// Mock notifier for testing.
#[derive(Debug, Default)]
pub struct MockAlarmNotifier {
    calls: Mutex<Vec<CompletionMessage>>,
    should_fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MockAlarmNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Makes every call block for `delay` before recording.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap_or_else(|e| e.into_inner()) = Some(delay);
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<CompletionMessage> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl AlarmNotifier for MockAlarmNotifier {
    fn notify_completion(&self, title: &str, body: &str) -> Result<(), AlarmError> {
        let delay = *self.delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(CompletionMessage {
                title: title.to_string(),
                body: body.to_string(),
            });
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(AlarmError::Failed("Mock failure".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ============================================================================
// Tests
// ============================================================================
