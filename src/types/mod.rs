//! Core data types for the dashboard timers.
//!
//! This module defines the data structures used for:
//! - Timer records and their state transitions
//! - Completion events emitted by the tick step
//! - IPC request/response serialization

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// TimerMode
// ============================================================================

/// Caller-defined category of a timer.
///
/// The mode only changes the wording of the completion notification;
/// scheduling is identical for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    /// Focus session
    #[default]
    Work,
    /// Break between focus sessions
    Break,
}

impl TimerMode {
    /// Returns the string representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Ok(TimerMode::Work),
            "break" => Ok(TimerMode::Break),
            other => Err(format!("unknown timer mode '{other}' (expected work or break)")),
        }
    }
}

// ============================================================================
// Timer
// ============================================================================

/// A single named countdown timer.
///
/// Serialized with the camelCase keys used by the dashboard snapshot
/// (`timeLeft`, `totalTime`, `isActive`, `startedAt`). `startedAt` is an
/// epoch-millisecond timestamp and is present exactly when the timer is
/// active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    /// Caller-chosen unique key
    pub id: String,
    /// Free-text annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Work or break
    pub mode: TimerMode,
    /// Remaining seconds
    pub time_left: u32,
    /// Seconds the timer was (re)armed with
    pub total_time: u32,
    /// Whether the scheduler is counting this timer down
    #[serde(default)]
    pub is_active: bool,
    /// Epoch milliseconds of the last start, present iff active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
}

impl Timer {
    /// Creates an armed, inactive timer with the full duration remaining.
    pub fn new(
        id: impl Into<String>,
        mode: TimerMode,
        duration: u32,
        label: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label,
            mode,
            time_left: duration,
            total_time: duration,
            is_active: false,
            started_at: None,
        }
    }

    /// Marks the timer as running from `now_ms`.
    ///
    /// Returns false (and leaves the timer untouched) when nothing is left
    /// to count down.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.time_left == 0 {
            return false;
        }
        self.is_active = true;
        self.started_at = Some(now_ms);
        true
    }

    /// Stops the countdown, keeping the remaining time as is.
    pub fn pause(&mut self) {
        self.is_active = false;
        self.started_at = None;
    }

    /// Re-arms the timer with `duration` seconds and stops it.
    pub fn reset(&mut self, duration: u32) {
        self.time_left = duration;
        self.total_time = duration;
        self.pause();
    }

    /// Decrements the timer by one second.
    ///
    /// `started_at` moves forward by the same second, so the persisted
    /// `(time_left, started_at)` pair always describes one instant and a
    /// reload only subtracts time that was not ticked.
    ///
    /// Returns true if this tick completed the timer. A completed timer is
    /// deactivated in the same step, so a later tick never reports it again.
    pub fn tick(&mut self) -> bool {
        if !self.is_active {
            return false;
        }
        self.time_left = self.time_left.saturating_sub(1);
        self.started_at = self.started_at.map(|t| t.saturating_add(1000));
        if self.time_left == 0 {
            self.pause();
            return true;
        }
        false
    }

    /// Recomputes the remaining time of an active timer from wall-clock time.
    ///
    /// Whole seconds elapsed since `started_at` are subtracted. A timer that
    /// ran out while nobody was ticking it is stopped at zero; one that is
    /// still running is re-baselined to `now_ms`. Returns true if any field
    /// changed.
    pub fn catch_up(&mut self, now_ms: u64) -> bool {
        let Some(started_at) = self.started_at.filter(|_| self.is_active) else {
            return false;
        };
        let elapsed = now_ms.saturating_sub(started_at) / 1000;
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.time_left = self.time_left.saturating_sub(elapsed);
        if self.time_left == 0 {
            self.pause();
        } else {
            self.started_at = Some(now_ms);
        }
        true
    }

    /// Repairs a record read from persistence.
    ///
    /// Returns `None` for records that cannot be repaired (zero total time).
    pub fn normalized(mut self, id: &str) -> Option<Self> {
        if self.total_time == 0 {
            return None;
        }
        if self.id != id {
            self.id = id.to_string();
        }
        self.time_left = self.time_left.min(self.total_time);
        if !self.is_active || self.started_at.is_none() || self.time_left == 0 {
            self.pause();
        }
        Some(self)
    }

    /// Fraction of the armed duration already consumed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.total_time == 0 {
            return 1.0;
        }
        f64::from(self.total_time - self.time_left.min(self.total_time))
            / f64::from(self.total_time)
    }

    /// Returns true if the timer ran down to zero.
    pub fn is_complete(&self) -> bool {
        self.time_left == 0
    }

    /// Builds the completion event for this timer.
    pub fn completion_event(&self) -> CompletionEvent {
        CompletionEvent {
            id: self.id.clone(),
            mode: self.mode,
            label: self.label.clone(),
        }
    }
}

/// Full serialized registry, keyed by timer id.
pub type Snapshot = BTreeMap<String, Timer>;

// ============================================================================
// CompletionEvent
// ============================================================================

/// Emitted once when a timer reaches zero on a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    /// Id of the completed timer
    pub id: String,
    /// Mode of the completed timer
    pub mode: TimerMode,
    /// Label of the completed timer, if any
    pub label: Option<String>,
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Create or re-arm a timer
    Create {
        /// Timer id
        id: String,
        /// Timer mode
        mode: TimerMode,
        /// Duration in seconds; the mode default is used when absent or zero
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u32>,
        /// Optional label
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Start counting a timer down
    Start {
        /// Timer id
        id: String,
    },
    /// Pause a timer
    Pause {
        /// Timer id
        id: String,
    },
    /// Re-arm a timer with its total time or a new duration
    Reset {
        /// Timer id
        id: String,
        /// New duration in seconds
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u32>,
    },
    /// Replace a timer's label
    Label {
        /// Timer id
        id: String,
        /// New label
        label: String,
    },
    /// Remove a timer
    Delete {
        /// Timer id
        id: String,
    },
    /// Query a single timer
    Get {
        /// Timer id
        id: String,
    },
    /// Query all timers
    List,
}

impl IpcRequest {
    /// Returns the timer id the request targets, if any.
    pub fn timer_id(&self) -> Option<&str> {
        match self {
            IpcRequest::Create { id, .. }
            | IpcRequest::Start { id }
            | IpcRequest::Pause { id }
            | IpcRequest::Reset { id, .. }
            | IpcRequest::Label { id, .. }
            | IpcRequest::Delete { id }
            | IpcRequest::Get { id } => Some(id),
            IpcRequest::List => None,
        }
    }
}

/// Response data for IPC responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Timers affected by or returned from the request
    #[serde(default)]
    pub timers: Vec<Timer>,
}

impl ResponseData {
    /// Creates response data holding a single timer.
    pub fn single(timer: Timer) -> Self {
        Self {
            timers: vec![timer],
        }
    }

    /// Creates response data holding several timers.
    pub fn many(timers: Vec<Timer>) -> Self {
        Self { timers }
    }
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Optional response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ResponseData>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<ResponseData>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
            data,
        }
    }

    /// Creates an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            data: None,
        }
    }

    /// Returns true for error responses.
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }

    /// Returns the timers carried by the response (empty when none).
    pub fn timers(&self) -> &[Timer] {
        self.data.as_ref().map(|d| d.timers.as_slice()).unwrap_or(&[])
    }
}

// ============================================================================
// Tests
// ============================================================================
