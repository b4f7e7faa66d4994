//! Completion bell played through rodio.
//!
//! The bell is synthesized rather than decoded from a file: one 800 Hz tone
//! followed by two shorter 700 Hz beeps at decreasing volume.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rodio::source::{SineWave, Source, Zero};
use rodio::{OutputStream, Sink};
use tracing::{debug, warn};

use super::error::AlarmError;
use super::AlarmNotifier;

/// Default alarm volume (0.0 to 1.0).
pub const DEFAULT_VOLUME: f32 = 0.5;

const SILENCE_SAMPLE_RATE: u32 = 48_000;

/// One segment of the bell pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    /// Tone frequency in Hz
    pub frequency_hz: f32,
    /// How long the tone sounds
    pub duration: Duration,
    /// Amplitude, 0.0 to 1.0
    pub volume: f32,
    /// Silence after the tone
    pub pause_after: Duration,
}

/// Returns the bell pattern for the given volume.
#[must_use]
pub fn bell_pattern(volume: f32) -> Vec<Tone> {
    let volume = volume.clamp(0.0, 1.0);
    vec![
        Tone {
            frequency_hz: 800.0,
            duration: Duration::from_millis(500),
            volume,
            pause_after: Duration::from_millis(100),
        },
        Tone {
            frequency_hz: 700.0,
            duration: Duration::from_millis(300),
            volume: volume * 0.8,
            pause_after: Duration::from_millis(300),
        },
        Tone {
            frequency_hz: 700.0,
            duration: Duration::from_millis(300),
            volume: volume * 0.6,
            pause_after: Duration::ZERO,
        },
    ]
}

/// Alarm that plays the completion bell on the default output device.
///
/// The output stream is opened per alarm, so the notifier holds no audio
/// handles and can be shared across threads. A device failure turns the
/// alarm off for the rest of the daemon's life. Playback blocks until the bell
/// finishes; the dispatcher runs it on a blocking worker.
#[derive(Debug)]
pub struct SoundAlarm {
    volume: f32,
    disabled: AtomicBool,
}

impl SoundAlarm {
    /// Creates a sound alarm without touching the audio device.
    #[must_use]
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            disabled: AtomicBool::new(false),
        }
    }

    /// Creates a sound alarm after checking that an output device exists.
    ///
    /// # Errors
    ///
    /// Returns `AlarmError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn probe(volume: f32) -> Result<Self, AlarmError> {
        let (_stream, _handle) = OutputStream::try_default()
            .map_err(|e| AlarmError::DeviceNotAvailable(e.to_string()))?;
        debug!("Audio output device available");
        Ok(Self::new(volume))
    }

    /// Returns the configured volume.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Returns true once a device failure has switched playback off.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Relaxed)
    }

    /// Switches playback off after the output device went away, so later
    /// alarms do not reopen it.
    fn record_failure(&self, err: &AlarmError) {
        if err.is_device_error() && !self.disabled.swap(true, Ordering::Relaxed) {
            warn!("Audio device lost, completion bell disabled: {}", err);
        }
    }

    fn play_bell(&self) -> Result<(), AlarmError> {
        let (_stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AlarmError::DeviceNotAvailable(e.to_string()))?;
        let sink =
            Sink::try_new(&stream_handle).map_err(|e| AlarmError::StreamError(e.to_string()))?;

        for tone in bell_pattern(self.volume) {
            sink.append(
                SineWave::new(tone.frequency_hz)
                    .take_duration(tone.duration)
                    .amplify(tone.volume)
                    .fade_in(Duration::from_millis(20)),
            );
            if !tone.pause_after.is_zero() {
                sink.append(
                    Zero::<f32>::new(1, SILENCE_SAMPLE_RATE).take_duration(tone.pause_after),
                );
            }
        }

        // The stream must outlive playback.
        sink.sleep_until_end();
        Ok(())
    }
}

impl AlarmNotifier for SoundAlarm {
    fn notify_completion(&self, _title: &str, _body: &str) -> Result<(), AlarmError> {
        if self.is_disabled() {
            debug!("Sound alarm disabled, skipping");
            return Ok(());
        }
        self.play_bell().inspect_err(|e| self.record_failure(e))
    }

    fn name(&self) -> &'static str {
        "sound"
    }
}

/// Creates a sound alarm, returning None if audio is unavailable.
#[must_use]
pub fn try_create_sound_alarm(volume: f32) -> Option<Arc<SoundAlarm>> {
    match SoundAlarm::probe(volume) {
        Ok(alarm) => Some(Arc::new(alarm)),
        Err(e) => {
            warn!("Audio not available, completion bell disabled: {}", e);
            None
        }
    }
}
