//! Desktop notifications via notify-rust.

use notify_rust::Notification;
use tracing::debug;

use super::error::AlarmError;
use super::AlarmNotifier;

/// Application name shown by the notification server.
const APP_NAME: &str = "dashtimer";

/// Alarm that raises a desktop notification.
#[derive(Debug, Clone, Default)]
pub struct DesktopAlarm;

impl DesktopAlarm {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AlarmNotifier for DesktopAlarm {
    fn notify_completion(&self, title: &str, body: &str) -> Result<(), AlarmError> {
        Notification::new()
            .appname(APP_NAME)
            .summary(title)
            .body(body)
            .show()
            .map_err(|e| AlarmError::NotificationFailed(e.to_string()))?;
        debug!("Desktop notification shown: {}", title);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "desktop"
    }
}
