//! Display utilities for the Pomodoro Timer CLI.
//!
//! This module provides formatted output for:
//! - Intent results
//! - Error messages
//! - Full and compact status display

use crate::daemon::timer::CYCLE_MODULUS;
use crate::types::{IpcResponse, TimerSnapshot};

/// Width of the progress bar in characters
const PROGRESS_BAR_WIDTH: usize = 20;

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the daemon's message followed by the time line.
    pub fn show_result(response: &IpcResponse) {
        if !response.message.is_empty() {
            println!("* {}", response.message);
        }
        if let Some(data) = &response.data {
            println!("  {}", Self::render_compact(data));
        }
    }

    /// Shows the current timer status.
    pub fn show_status(response: &IpcResponse) {
        match &response.data {
            Some(data) => println!("{}", Self::render_status(data)),
            None => println!("タイマーは起動していません"),
        }
    }

    /// Shows the one-line status.
    pub fn show_compact(response: &IpcResponse) {
        if let Some(data) = &response.data {
            println!("{}", Self::render_compact(data));
        }
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Renders the full status block.
    pub fn render_status(data: &TimerSnapshot) -> String {
        let state = if data.is_running {
            "実行中"
        } else {
            "一時停止中"
        };
        let auto_advance = if data.auto_advance { "オン" } else { "オフ" };

        [
            "ポモドーロタイマー ステータス".to_string(),
            "─────────────────────────────".to_string(),
            format!("モード: {}", data.mode.label()),
            format!("状態: {}", state),
            format!("残り時間: {}", Self::format_time(data.remaining_seconds)),
            format!("進捗: {}", Self::progress_bar(data.progress)),
            format!("サイクル: {}", Self::cycle_dots(data.cycle_count)),
            format!("速度: {}x", data.speed_multiplier),
            format!("自動開始: {}", auto_advance),
        ]
        .join("\n")
    }

    /// Renders `mm:ss MODE`.
    pub fn render_compact(data: &TimerSnapshot) -> String {
        format!(
            "{} {}",
            Self::format_time(data.remaining_seconds),
            data.mode.label()
        )
    }

    /// Formats remaining seconds as `mm:ss`.
    pub fn format_time(total_seconds: u64) -> String {
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }

    /// One filled dot per completed focus session.
    fn cycle_dots(cycle_count: u8) -> String {
        (0..CYCLE_MODULUS)
            .map(|i| if i < cycle_count { '●' } else { '○' })
            .collect()
    }

    fn progress_bar(progress: f64) -> String {
        let progress = progress.clamp(0.0, 1.0);
        let filled = (progress * PROGRESS_BAR_WIDTH as f64).round() as usize;
        format!(
            "[{}{}] {:>3}%",
            "#".repeat(filled),
            "-".repeat(PROGRESS_BAR_WIDTH - filled),
            (progress * 100.0).round() as u32
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
