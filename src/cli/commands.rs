//! Command definitions for the Pomodoro Timer CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::{BreakType, ConfigPatch, TimerMode};

// ============================================================================
// CLI Structure
// ============================================================================

/// pomodash - Pomodoro interval timer
#[derive(Parser, Debug)]
#[command(
    name = "pomodash",
    version,
    about = "ポモドーロ・インターバルタイマー",
    long_about = "集中・短い休憩・長い休憩を切り替えるインターバルタイマー。\n\
                  デーモンがタイマーを保持し、CLIはUnixソケット経由で操作します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path of the daemon socket (default: ~/.pomodash/pomodash.sock)
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start or pause the countdown
    Toggle,

    /// Stop and restore the full duration of the current mode
    Reset,

    /// Jump to the next mode
    Skip,

    /// Set the speed multiplier (e.g. 0.5, 2, 60)
    Speed {
        /// Positive multiplier
        #[arg(value_parser = parse_speed)]
        multiplier: f64,
    },

    /// Switch to focus or break
    Mode {
        /// Mode to switch to
        #[arg(value_enum)]
        mode: ModeArg,
    },

    /// Set the completed-focus counter (0-3)
    Cycle {
        /// New counter value
        #[arg(value_parser = clap::value_parser!(i64).range(0..=3))]
        count: i64,
    },

    /// Change durations and break settings
    Config(ConfigArgs),

    /// Turn automatic start of the next mode on or off
    AutoAdvance {
        /// New setting
        #[arg(value_enum)]
        state: Switch,
    },

    /// Show current timer status
    Status {
        /// One-line `mm:ss MODE` output
        #[arg(short, long)]
        compact: bool,
    },

    /// Run as daemon (background service)
    #[command(hide = true)]
    Daemon {
        /// Settings file (default: ~/.pomodash/settings.json)
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ============================================================================
// Value Enums
// ============================================================================

/// Mode selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    /// Focus session
    Focus,
    /// The configured break kind
    Break,
}

impl ModeArg {
    /// Maps to the requested engine mode.
    ///
    /// The daemon substitutes the configured break kind, so `Break` maps to
    /// a short break request.
    pub fn to_mode(self) -> TimerMode {
        match self {
            Self::Focus => TimerMode::Focus,
            Self::Break => TimerMode::ShortBreak,
        }
    }
}

/// On/off switch.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// Enabled
    On,
    /// Disabled
    Off,
}

impl Switch {
    /// Returns true for `on`.
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

/// Break kind selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakTypeArg {
    /// Short break after each focus session
    Short,
    /// Long break after each focus session
    Long,
}

impl From<BreakTypeArg> for BreakType {
    fn from(arg: BreakTypeArg) -> Self {
        match arg {
            BreakTypeArg::Short => BreakType::Short,
            BreakTypeArg::Long => BreakType::Long,
        }
    }
}

// ============================================================================
// Config Command Arguments
// ============================================================================

/// Arguments for the config command
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Focus duration in minutes (1-1440)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub focus: Option<u32>,

    /// Short break duration in minutes (1-1440)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub short_break: Option<u32>,

    /// Long break duration in minutes (1-1440)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=1440))]
    pub long_break: Option<u32>,

    /// Break taken after each focus session
    #[arg(long, value_enum)]
    pub break_type: Option<BreakTypeArg>,

    /// Focus sessions before a forced long break (1-10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub cycles: Option<u32>,
}

impl ConfigArgs {
    /// Converts the flags into a partial configuration update.
    pub fn to_patch(&self) -> ConfigPatch {
        ConfigPatch {
            focus_minutes: self.focus,
            short_break_minutes: self.short_break,
            long_break_minutes: self.long_break,
            break_type: self.break_type.map(BreakType::from),
            cycles_before_long_break: self.cycles,
        }
    }
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Parses a speed multiplier.
///
/// - Must be a finite number
/// - Must be greater than zero
fn parse_speed(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("数値を指定してください: {}", s))?;
    if !value.is_finite() || value <= 0.0 {
        return Err("速度倍率は正の数で指定してください".to_string());
    }
    Ok(value)
}

// ============================================================================
// Tests
// ============================================================================
