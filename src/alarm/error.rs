//! Alarm error types.
//!
//! Alarm failures never affect timer state; the dispatcher logs them and
//! moves on.

use thiserror::Error;

/// Errors that can occur while raising a completion alarm.
#[derive(Debug, Error)]
pub enum AlarmError {
    /// Audio device is not available (e.g., headless machine).
    #[error("audio device not available: {0}")]
    DeviceNotAvailable(String),

    /// Failed to create the audio output sink.
    #[error("failed to create audio sink: {0}")]
    StreamError(String),

    /// The desktop notification could not be shown.
    #[error("failed to show notification: {0}")]
    NotificationFailed(String),

    /// Generic alarm failure.
    #[error("alarm failed: {0}")]
    Failed(String),
}

impl AlarmError {
    /// Returns true if this error is related to audio device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::StreamError(_))
    }
}
