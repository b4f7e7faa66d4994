//! Daemon configuration.
//!
//! Paths default to `$DASHTIMER_HOME` when set, otherwise `~/.dashtimer/`.
//! Every field can be overridden from the `daemon` subcommand.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alarm::DEFAULT_VOLUME;
use crate::store::StoreConfig;

/// Environment variable overriding the state directory.
pub const HOME_ENV: &str = "DASHTIMER_HOME";

/// Directory under the user's home used when `DASHTIMER_HOME` is unset.
const DEFAULT_DIR_NAME: &str = ".dashtimer";

/// Snapshot file name.
pub const STATE_FILE_NAME: &str = "timers.json";

/// Socket file name.
pub const SOCKET_FILE_NAME: &str = "dashtimer.sock";

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Neither `DASHTIMER_HOME` nor a home directory is available.
    #[error("cannot locate a home directory; set {HOME_ENV}")]
    NoHomeDirectory,

    /// A default duration of zero seconds was configured.
    #[error("default {0} duration must be at least one second")]
    ZeroDuration(&'static str),

    /// Alarm volume outside 0.0..=1.0.
    #[error("alarm volume must be between 0.0 and 1.0 (got {0})")]
    InvalidVolume(f32),
}

/// Returns the directory holding the snapshot and the socket.
///
/// # Errors
///
/// Returns `ConfigError::NoHomeDirectory` if no directory can be derived.
pub fn state_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .ok_or(ConfigError::NoHomeDirectory)
}

/// Returns the default IPC socket path.
///
/// # Errors
///
/// Returns an error if the state directory cannot be derived.
pub fn default_socket_path() -> Result<PathBuf, ConfigError> {
    Ok(state_dir()?.join(SOCKET_FILE_NAME))
}

/// Settings for the timer daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Snapshot file
    pub state_path: PathBuf,
    /// Unix socket the daemon listens on
    pub socket_path: PathBuf,
    /// Default durations for timers created without one
    pub store: StoreConfig,
    /// Whether to play the completion bell
    pub sound: bool,
    /// Whether to raise desktop notifications
    pub desktop_notifications: bool,
    /// Bell volume, 0.0 to 1.0
    pub alarm_volume: f32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        let dir = state_dir().unwrap_or_else(|_| PathBuf::from(DEFAULT_DIR_NAME));
        Self::in_dir(dir)
    }
}

impl DaemonConfig {
    /// Default configuration with the snapshot and socket inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            state_path: dir.join(STATE_FILE_NAME),
            socket_path: dir.join(SOCKET_FILE_NAME),
            store: StoreConfig::default(),
            sound: true,
            desktop_notifications: true,
            alarm_volume: DEFAULT_VOLUME,
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.default_work_secs == 0 {
            return Err(ConfigError::ZeroDuration("work"));
        }
        if self.store.default_break_secs == 0 {
            return Err(ConfigError::ZeroDuration("break"));
        }
        if !(0.0..=1.0).contains(&self.alarm_volume) {
            return Err(ConfigError::InvalidVolume(self.alarm_volume));
        }
        Ok(())
    }
}
