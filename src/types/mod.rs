//! Core data types for the interval timer.
//!
//! This module defines the data structures used for:
//! - Timer modes and break-type policy
//! - Timer configuration with validation
//! - Immutable state snapshots for rendering
//! - IPC request/response serialization

use serde::{Deserialize, Serialize};

use crate::daemon::error::EngineError;

// ============================================================================
// TimerMode
// ============================================================================

/// The mode the timer is counting down in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    /// Focus session
    #[default]
    Focus,
    /// Short break
    ShortBreak,
    /// Long break
    LongBreak,
}

impl TimerMode {
    /// Returns the wire representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "shortBreak",
            TimerMode::LongBreak => "longBreak",
        }
    }

    /// Returns the upper-case label shown under the countdown.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "FOCUS",
            TimerMode::ShortBreak => "SHORT BREAK",
            TimerMode::LongBreak => "LONG BREAK",
        }
    }

    /// Returns true for either break mode.
    pub fn is_break(&self) -> bool {
        matches!(self, TimerMode::ShortBreak | TimerMode::LongBreak)
    }
}

// ============================================================================
// BreakType
// ============================================================================

/// Which break kind follows a focus session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakType {
    /// Short breaks between focus sessions
    #[default]
    Short,
    /// Long breaks between focus sessions
    Long,
}

impl BreakType {
    /// Returns the break mode this policy selects.
    pub fn mode(&self) -> TimerMode {
        match self {
            BreakType::Short => TimerMode::ShortBreak,
            BreakType::Long => TimerMode::LongBreak,
        }
    }

    /// Returns the wire representation of the break type.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakType::Short => "short",
            BreakType::Long => "long",
        }
    }
}

// ============================================================================
// TimerConfig
// ============================================================================

/// Lower bound for `cycles_before_long_break`.
pub const MIN_CYCLES_BEFORE_LONG_BREAK: u32 = 1;

/// Upper bound for `cycles_before_long_break`.
pub const MAX_CYCLES_BEFORE_LONG_BREAK: u32 = 10;

/// User-tunable timer configuration.
///
/// Serialized with the same camelCase keys the settings store uses. Keys
/// missing from a stored snapshot take their default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerConfig {
    /// Focus duration in minutes
    pub focus_minutes: u32,
    /// Short break duration in minutes
    pub short_break_minutes: u32,
    /// Long break duration in minutes
    pub long_break_minutes: u32,
    /// Break kind that follows a focus session
    pub break_type: BreakType,
    /// Focus sessions completed before a long break is forced (1-10)
    pub cycles_before_long_break: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            break_type: BreakType::Short,
            cycles_before_long_break: 4,
        }
    }
}

impl TimerConfig {
    /// Sets the focus duration.
    pub fn with_focus_minutes(mut self, minutes: u32) -> Self {
        self.focus_minutes = minutes;
        self
    }

    /// Sets the short break duration.
    pub fn with_short_break_minutes(mut self, minutes: u32) -> Self {
        self.short_break_minutes = minutes;
        self
    }

    /// Sets the long break duration.
    pub fn with_long_break_minutes(mut self, minutes: u32) -> Self {
        self.long_break_minutes = minutes;
        self
    }

    /// Sets the break type.
    pub fn with_break_type(mut self, break_type: BreakType) -> Self {
        self.break_type = break_type;
        self
    }

    /// Sets the long-break threshold.
    pub fn with_cycles_before_long_break(mut self, cycles: u32) -> Self {
        self.cycles_before_long_break = cycles;
        self
    }

    /// Validates the configured durations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidDuration`] naming the first duration
    /// that is not positive.
    pub fn validate(&self) -> Result<(), EngineError> {
        let fields = [
            ("focusMinutes", self.focus_minutes),
            ("shortBreakMinutes", self.short_break_minutes),
            ("longBreakMinutes", self.long_break_minutes),
        ];
        for (field, minutes) in fields {
            if minutes == 0 {
                return Err(EngineError::InvalidDuration { field, minutes });
            }
        }
        Ok(())
    }

    /// Returns the configuration with `cycles_before_long_break` clamped to 1-10.
    pub fn normalized(mut self) -> Self {
        self.cycles_before_long_break = self
            .cycles_before_long_break
            .clamp(MIN_CYCLES_BEFORE_LONG_BREAK, MAX_CYCLES_BEFORE_LONG_BREAK);
        self
    }

    /// Returns the configured duration of `mode` in minutes.
    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Focus => self.focus_minutes,
            TimerMode::ShortBreak => self.short_break_minutes,
            TimerMode::LongBreak => self.long_break_minutes,
        }
    }

    /// Returns the configured duration of `mode` in seconds.
    pub fn seconds_for(&self, mode: TimerMode) -> u64 {
        u64::from(self.minutes_for(mode)) * 60
    }

    /// Returns the configured duration of `mode` in milliseconds.
    pub fn millis_for(&self, mode: TimerMode) -> u64 {
        self.seconds_for(mode) * 1000
    }
}

// ============================================================================
// ConfigPatch
// ============================================================================

/// Partial configuration update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_break_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_break_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_type: Option<BreakType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles_before_long_break: Option<u32>,
}

impl ConfigPatch {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.focus_minutes.is_none()
            && self.short_break_minutes.is_none()
            && self.long_break_minutes.is_none()
            && self.break_type.is_none()
            && self.cycles_before_long_break.is_none()
    }

    /// Merges the patch over `base`.
    pub fn apply_to(&self, base: &TimerConfig) -> TimerConfig {
        TimerConfig {
            focus_minutes: self.focus_minutes.unwrap_or(base.focus_minutes),
            short_break_minutes: self.short_break_minutes.unwrap_or(base.short_break_minutes),
            long_break_minutes: self.long_break_minutes.unwrap_or(base.long_break_minutes),
            break_type: self.break_type.unwrap_or(base.break_type),
            cycles_before_long_break: self
                .cycles_before_long_break
                .unwrap_or(base.cycles_before_long_break),
        }
    }
}

// ============================================================================
// TimerSnapshot
// ============================================================================

/// Immutable view of the engine state handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    /// Current mode
    pub mode: TimerMode,
    /// Remaining time, rounded up to whole seconds
    pub remaining_seconds: u64,
    /// Remaining time in milliseconds
    pub remaining_ms: u64,
    /// Whether the countdown is running
    pub is_running: bool,
    /// Completed focus sessions since the last long break (0-3)
    pub cycle_count: u8,
    /// Elapsed fraction of the current mode (0.0-1.0)
    pub progress: f64,
    /// Tick rate scale
    pub speed_multiplier: f64,
    /// Whether the next mode starts automatically
    pub auto_advance: bool,
}

// ============================================================================
// IPC Types
// ============================================================================

/// IPC request from client to daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum IpcRequest {
    /// Start or pause the countdown
    Toggle,
    /// Stop and restore the current mode's duration
    Reset,
    /// Jump to the next mode
    Skip,
    /// Change the tick rate scale
    Speed {
        /// Positive multiplier
        multiplier: f64,
    },
    /// Switch mode manually
    Mode {
        /// Requested mode
        mode: TimerMode,
    },
    /// Override the cycle counter
    Cycle {
        /// New counter value (clamped to 0-3)
        count: i64,
    },
    /// Apply a partial configuration update
    Configure {
        /// Fields to change
        #[serde(flatten)]
        patch: ConfigPatch,
    },
    /// Enable or disable auto-advance
    AutoAdvance {
        /// New auto-advance flag
        enabled: bool,
    },
    /// Query the current status
    Status,
}

/// IPC response from daemon to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcResponse {
    /// Response status ("success" or "error")
    pub status: String,
    /// Human-readable message
    pub message: String,
    /// Snapshot after the request was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<TimerSnapshot>,
}

impl IpcResponse {
    /// Creates a success response.
    pub fn success(message: impl Into<String>, data: Option<TimerSnapshot>) -> Self {
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

    /// Returns true for a success response.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

// ============================================================================
// Tests
// ============================================================================
