//! Command definitions for the dashtimer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{ConfigError, DaemonConfig};
use crate::types::TimerMode;

/// Maximum label length in characters
const MAX_LABEL_LEN: usize = 100;

// ============================================================================
// CLI Structure
// ============================================================================

/// Persistent countdown timers for dashboard widgets
#[derive(Parser, Debug)]
#[command(
    name = "dashtimer",
    version,
    about = "Persistent countdown timers for dashboard widgets",
    long_about = "Named work/break countdown timers that survive restarts.\n\
                  A background daemon keeps time and raises an alarm when a timer finishes;\n\
                  the other subcommands talk to it over a Unix socket.",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Daemon socket path (defaults to $DASHTIMER_HOME/dashtimer.sock)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the timer daemon in the foreground
    Daemon(DaemonArgs),

    /// Create a timer, replacing any timer with the same id
    Create(CreateArgs),

    /// Start or resume a timer
    Start {
        /// Timer id
        id: String,
    },

    /// Pause a timer
    Pause {
        /// Timer id
        id: String,
    },

    /// Reset a timer to its full duration
    Reset {
        /// Timer id
        id: String,

        /// New duration in seconds
        #[arg(short, long, value_name = "SECS")]
        duration: Option<u32>,
    },

    /// Set a timer's label
    Label {
        /// Timer id
        id: String,

        /// New label
        #[arg(value_parser = validate_label)]
        text: String,
    },

    /// Delete a timer
    Delete {
        /// Timer id
        id: String,
    },

    /// Show one timer, or all timers
    Status {
        /// Timer id
        id: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Create Command Arguments
// ============================================================================

/// Arguments for the create command
#[derive(Args, Debug, Clone)]
pub struct CreateArgs {
    /// Timer id, e.g. pomodoro-1
    pub id: String,

    /// Timer mode
    #[arg(short, long, default_value = "work")]
    pub mode: TimerMode,

    /// Duration in seconds (defaults to the mode's default)
    #[arg(short, long, value_name = "SECS", conflicts_with = "minutes")]
    pub duration: Option<u32>,

    /// Duration in minutes (1-240)
    #[arg(
        long,
        value_name = "MIN",
        value_parser = clap::value_parser!(u32).range(1..=240)
    )]
    pub minutes: Option<u32>,

    /// Label shown on the widget and in the completion alarm
    #[arg(short, long, value_parser = validate_label)]
    pub label: Option<String>,
}

impl CreateArgs {
    /// Requested duration in seconds, if any.
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration.or(self.minutes.map(|m| m * 60))
    }
}

// ============================================================================
// Daemon Command Arguments
// ============================================================================

/// Arguments for the daemon command
#[derive(Args, Debug, Clone, Default)]
pub struct DaemonArgs {
    /// Snapshot file (defaults to $DASHTIMER_HOME/timers.json)
    #[arg(long, value_name = "PATH")]
    pub state_file: Option<PathBuf>,

    /// Disable the completion bell
    #[arg(long)]
    pub no_sound: bool,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Bell volume (0.0-1.0)
    #[arg(long, value_name = "VOLUME")]
    pub volume: Option<f32>,

    /// Default work duration in seconds
    #[arg(long, value_name = "SECS")]
    pub work_secs: Option<u32>,

    /// Default break duration in seconds
    #[arg(long, value_name = "SECS")]
    pub break_secs: Option<u32>,
}

impl DaemonArgs {
    /// Builds the daemon configuration from defaults and these overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn into_config(self, socket: Option<PathBuf>) -> Result<DaemonConfig, ConfigError> {
        let mut config = DaemonConfig::default();
        if let Some(path) = self.state_file {
            config.state_path = path;
        }
        if let Some(path) = socket {
            config.socket_path = path;
        }
        if let Some(secs) = self.work_secs {
            config.store.default_work_secs = secs;
        }
        if let Some(secs) = self.break_secs {
            config.store.default_break_secs = secs;
        }
        if let Some(volume) = self.volume {
            config.alarm_volume = volume;
        }
        config.sound = !self.no_sound;
        config.desktop_notifications = !self.no_notify;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validates a label.
///
/// - Must not be empty
/// - Must not exceed 100 characters
fn validate_label(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("Label must not be empty".to_string());
    }
    if s.chars().count() > MAX_LABEL_LEN {
        return Err(format!("Label must be at most {MAX_LABEL_LEN} characters"));
    }
    Ok(s.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------------
    // Cli Tests
    // ------------------------------------------------------------------------

    mod cli_tests {
        use super::*;

        #[test]
        fn test_parse_no_args() {
            let cli = Cli::parse_from(["dashtimer"]);
            assert!(cli.command.is_none());
            assert!(!cli.verbose);
            assert!(cli.socket.is_none());
        }

        #[test]
        fn test_parse_verbose_flag() {
            let cli = Cli::parse_from(["dashtimer", "-v", "status"]);
            assert!(cli.verbose);
        }

        #[test]
        fn test_parse_global_socket() {
            let cli = Cli::parse_from(["dashtimer", "status", "--socket", "/tmp/d.sock"]);
            assert_eq!(cli.socket, Some(PathBuf::from("/tmp/d.sock")));
        }

        #[test]
        fn test_parse_status_all_and_one() {
            let cli = Cli::parse_from(["dashtimer", "status"]);
            assert!(matches!(cli.command, Some(Commands::Status { id: None })));

            let cli = Cli::parse_from(["dashtimer", "status", "pomodoro-1"]);
            match cli.command {
                Some(Commands::Status { id }) => assert_eq!(id.as_deref(), Some("pomodoro-1")),
                _ => panic!("Expected Status command"),
            }
        }

        #[test]
        fn test_parse_reset_with_duration() {
            let cli = Cli::parse_from(["dashtimer", "reset", "a", "-d", "90"]);
            match cli.command {
                Some(Commands::Reset { id, duration }) => {
                    assert_eq!(id, "a");
                    assert_eq!(duration, Some(90));
                }
                _ => panic!("Expected Reset command"),
            }
        }

        #[test]
        fn test_parse_label_rejects_blank() {
            assert!(Cli::try_parse_from(["dashtimer", "label", "a", "  "]).is_err());
        }

        #[test]
        fn test_parse_completions_zsh() {
            let cli = Cli::parse_from(["dashtimer", "completions", "zsh"]);
            match cli.command {
                Some(Commands::Completions { shell }) => {
                    assert_eq!(shell, clap_complete::Shell::Zsh);
                }
                _ => panic!("Expected Completions command"),
            }
        }
    }

    // ------------------------------------------------------------------------
    // Create Command Tests
    // ------------------------------------------------------------------------

    mod create_args_tests {
        use super::*;

        fn parse_create(args: &[&str]) -> CreateArgs {
            let mut argv = vec!["dashtimer", "create"];
            argv.extend_from_slice(args);
            match Cli::parse_from(argv).command {
                Some(Commands::Create(args)) => args,
                _ => panic!("Expected Create command"),
            }
        }

        #[test]
        fn test_parse_create_defaults() {
            let args = parse_create(&["pomodoro-1"]);
            assert_eq!(args.id, "pomodoro-1");
            assert_eq!(args.mode, TimerMode::Work);
            assert_eq!(args.duration_secs(), None);
            assert!(args.label.is_none());
        }

        #[test]
        fn test_parse_create_break_with_label() {
            let args = parse_create(&["b", "--mode", "break", "--label", "Stretch"]);
            assert_eq!(args.mode, TimerMode::Break);
            assert_eq!(args.label.as_deref(), Some("Stretch"));
        }

        #[test]
        fn test_minutes_convert_to_seconds() {
            let args = parse_create(&["a", "--minutes", "10"]);
            assert_eq!(args.duration_secs(), Some(600));
        }

        #[test]
        fn test_duration_and_minutes_conflict() {
            let result =
                Cli::try_parse_from(["dashtimer", "create", "a", "-d", "60", "--minutes", "1"]);
            assert!(result.is_err());
        }

        #[test]
        fn test_invalid_mode_rejected() {
            assert!(Cli::try_parse_from(["dashtimer", "create", "a", "--mode", "nap"]).is_err());
        }

        #[test]
        fn test_label_too_long() {
            assert!(validate_label(&"x".repeat(101)).is_err());
            assert!(validate_label(&"x".repeat(100)).is_ok());
        }
    }

    // ------------------------------------------------------------------------
    // Daemon Command Tests
    // ------------------------------------------------------------------------

    mod daemon_args_tests {
        use super::*;

        #[test]
        fn test_overrides_applied() {
            let cli = Cli::parse_from([
                "dashtimer",
                "daemon",
                "--state-file",
                "/tmp/state.json",
                "--no-sound",
                "--work-secs",
                "600",
                "--volume",
                "0.2",
            ]);
            let Some(Commands::Daemon(args)) = cli.command else {
                panic!("Expected Daemon command");
            };
            let config = args.into_config(Some(PathBuf::from("/tmp/d.sock"))).unwrap();

            assert_eq!(config.state_path, PathBuf::from("/tmp/state.json"));
            assert_eq!(config.socket_path, PathBuf::from("/tmp/d.sock"));
            assert!(!config.sound);
            assert!(config.desktop_notifications);
            assert_eq!(config.store.default_work_secs, 600);
            assert_eq!(config.alarm_volume, 0.2);
        }

        #[test]
        fn test_invalid_override_rejected() {
            let args = DaemonArgs {
                break_secs: Some(0),
                ..DaemonArgs::default()
            };
            assert_eq!(
                args.into_config(None),
                Err(ConfigError::ZeroDuration("break"))
            );
        }
    }
}
