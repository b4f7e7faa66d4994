//! Display utilities for the dashtimer CLI.
//!
//! This module provides formatted output for:
//! - Command confirmations
//! - Error messages
//! - Timer rows with remaining time and a progress bar

use crate::types::{IpcResponse, Timer};

/// Width of the progress bar in cells
const BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the daemon's confirmation and the affected timer.
    pub fn show_result(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        for timer in response.timers() {
            println!("  {}", Self::timer_row(timer));
        }
    }

    /// Shows one or more timers as a table.
    pub fn show_status(response: &IpcResponse) {
        let timers = response.timers();
        if timers.is_empty() {
            if response.message.is_empty() {
                println!("No timers");
            } else {
                println!("{}", response.message);
            }
            return;
        }
        for timer in timers {
            println!("{}", Self::timer_row(timer));
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("Error: {}", message);
    }

    /// Renders one timer as a single line.
    ///
    /// ```text
    /// > pomodoro-1  work   12:30 [##########----------]  Write report
    /// ```
    pub fn timer_row(timer: &Timer) -> String {
        let marker = if timer.is_active {
            '>'
        } else if timer.is_complete() {
            '*'
        } else {
            '|'
        };
        let mut row = format!(
            "{} {:<12} {:<5} {} {}",
            marker,
            timer.id,
            timer.mode,
            Self::format_clock(timer.time_left),
            Self::progress_bar(timer.progress()),
        );
        if let Some(label) = &timer.label {
            row.push_str("  ");
            row.push_str(label);
        }
        row
    }

    /// Formats seconds as `mm:ss`, with minutes allowed past 59.
    pub fn format_clock(total_seconds: u32) -> String {
        let (minutes, seconds) = Self::format_time(total_seconds);
        format!("{:02}:{:02}", minutes, seconds)
    }

    fn progress_bar(progress: f64) -> String {
        let filled = (progress.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
        format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
    }

    /// Formats remaining seconds as (minutes, seconds).
    fn format_time(total_seconds: u32) -> (u32, u32) {
        (total_seconds / 60, total_seconds % 60)
    }
}

// ============================================================================
// Tests
// ============================================================================
