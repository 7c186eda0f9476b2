//! Timer engine for the interval timer.
//!
//! This module provides the core state machine:
//! - Mode transitions (Focus → ShortBreak/LongBreak → Focus)
//! - Cycle counting toward a forced long break
//! - Auto-advance vs. manual start of the next mode
//! - Speed-scaled ticks via the countdown clock arithmetic
//!
//! The engine is synchronous and owns no timers. Every operation returns
//! a fresh [`TimerSnapshot`]; scheduling lives in the service layer.

use tokio::sync::mpsc;

use crate::types::{ConfigPatch, TimerConfig, TimerMode, TimerSnapshot};

use super::clock::{self, TickOutcome};
use super::error::EngineError;

/// The cycle counter wraps at this value.
pub const CYCLE_MODULUS: u8 = 4;

/// Highest value the cycle counter can hold.
pub const MAX_CYCLE_COUNT: u8 = CYCLE_MODULUS - 1;

/// Speed multiplier a new engine starts with.
pub const DEFAULT_SPEED: f64 = 1.0;

// ============================================================================
// TimerEvent
// ============================================================================

/// Events emitted by the engine for logging and external integrations.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    /// Countdown started or resumed
    Started {
        /// Mode being counted down
        mode: TimerMode,
        /// Remaining seconds at start
        remaining_seconds: u64,
    },
    /// Countdown paused
    Paused {
        /// Mode being counted down
        mode: TimerMode,
        /// Remaining seconds at pause
        remaining_seconds: u64,
    },
    /// One clock tick was applied
    Tick {
        /// Remaining seconds after the tick
        remaining_seconds: u64,
    },
    /// The countdown reached zero
    Expired {
        /// Mode that expired
        mode: TimerMode,
    },
    /// A new mode was entered
    ModeChanged {
        /// Previous mode
        from: TimerMode,
        /// New mode
        to: TimerMode,
        /// Cycle counter after the transition
        cycle_count: u8,
        /// Whether the new mode started running
        auto_started: bool,
    },
    /// Countdown was reset to the mode's full duration
    Reset {
        /// Current mode
        mode: TimerMode,
    },
    /// Speed multiplier changed
    SpeedChanged {
        /// New multiplier
        multiplier: f64,
    },
    /// Cycle counter was overridden
    CycleUpdated {
        /// New counter value
        cycle_count: u8,
    },
    /// A new configuration was accepted
    ConfigurationApplied,
    /// Auto-advance flag changed
    AutoAdvanceChanged {
        /// New flag
        enabled: bool,
    },
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Interval timer state machine.
pub struct TimerEngine {
    config: TimerConfig,
    mode: TimerMode,
    remaining_ms: u64,
    is_running: bool,
    speed: f64,
    cycle_count: u8,
    auto_advance: bool,
    event_tx: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerEngine {
    /// Creates an idle engine in Focus mode.
    ///
    /// The configuration is expected to have passed
    /// [`TimerConfig::validate`]; the cycle threshold is clamped here.
    pub fn new(config: TimerConfig, event_tx: mpsc::UnboundedSender<TimerEvent>) -> Self {
        let config = config.normalized();
        let remaining_ms = config.millis_for(TimerMode::Focus);

        Self {
            config,
            mode: TimerMode::Focus,
            remaining_ms,
            is_running: false,
            speed: DEFAULT_SPEED,
            cycle_count: 0,
            auto_advance: true,
            event_tx,
        }
    }

    /// Sets the initial auto-advance flag.
    pub fn with_auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    // ------------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------------

    /// Starts or pauses the countdown.
    ///
    /// Starting with no time left is allowed; ticks have no effect until a
    /// reset or mode change restores a duration.
    pub fn toggle_run(&mut self) -> TimerSnapshot {
        self.is_running = !self.is_running;

        let remaining_seconds = self.remaining_seconds();
        let event = if self.is_running {
            TimerEvent::Started {
                mode: self.mode,
                remaining_seconds,
            }
        } else {
            TimerEvent::Paused {
                mode: self.mode,
                remaining_seconds,
            }
        };
        self.emit(event);

        self.snapshot()
    }

    /// Stops the countdown and restores the current mode's duration.
    ///
    /// Mode and cycle counter are left alone.
    pub fn reset(&mut self) -> TimerSnapshot {
        self.is_running = false;
        self.remaining_ms = self.config.millis_for(self.mode);
        self.emit(TimerEvent::Reset { mode: self.mode });
        self.snapshot()
    }

    /// Moves to the next mode as if the countdown had expired.
    pub fn skip(&mut self) -> TimerSnapshot {
        tracing::debug!(mode = self.mode.as_str(), "skipping");
        self.advance();
        self.snapshot()
    }

    /// Changes the tick rate scale.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSpeed`] unless `multiplier` is finite
    /// and positive. The previous speed is kept.
    pub fn set_speed(&mut self, multiplier: f64) -> Result<TimerSnapshot, EngineError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            tracing::warn!(multiplier, "rejected speed multiplier");
            return Err(EngineError::InvalidSpeed(multiplier));
        }

        self.speed = multiplier;
        self.emit(TimerEvent::SpeedChanged { multiplier });
        Ok(self.snapshot())
    }

    /// Switches mode manually.
    ///
    /// A requested break is replaced by the configured break kind. The cycle
    /// counter is not touched.
    pub fn set_mode(&mut self, requested: TimerMode) -> TimerSnapshot {
        let target = if requested.is_break() {
            self.config.break_type.mode()
        } else {
            requested
        };
        self.enter(target);
        self.snapshot()
    }

    /// Overrides the cycle counter, clamped to 0-3.
    pub fn update_cycle(&mut self, count: i64) -> TimerSnapshot {
        self.cycle_count = count.clamp(0, i64::from(MAX_CYCLE_COUNT)) as u8;
        self.emit(TimerEvent::CycleUpdated {
            cycle_count: self.cycle_count,
        });
        self.snapshot()
    }

    /// Replaces the configuration.
    ///
    /// While idle the remaining time is re-derived from the new durations.
    /// A running countdown keeps its remaining time.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidDuration`] for a non-positive duration.
    /// The previous configuration is kept.
    pub fn apply_configuration(&mut self, config: TimerConfig) -> Result<TimerSnapshot, EngineError> {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "rejected configuration");
            return Err(e);
        }

        self.config = config.normalized();
        if !self.is_running {
            self.remaining_ms = self.config.millis_for(self.mode);
        }
        self.emit(TimerEvent::ConfigurationApplied);

        Ok(self.snapshot())
    }

    /// Merges a partial update over the current configuration and applies it.
    ///
    /// # Errors
    ///
    /// See [`TimerEngine::apply_configuration`].
    pub fn apply_patch(&mut self, patch: &ConfigPatch) -> Result<TimerSnapshot, EngineError> {
        let merged = patch.apply_to(&self.config);
        self.apply_configuration(merged)
    }

    /// Enables or disables automatic start of the next mode.
    pub fn set_auto_advance(&mut self, enabled: bool) -> TimerSnapshot {
        self.auto_advance = enabled;
        self.emit(TimerEvent::AutoAdvanceChanged { enabled });
        self.snapshot()
    }

    /// Applies one clock tick.
    ///
    /// Does nothing while paused. The tick that reaches zero triggers the
    /// transition to the next mode; a tick at zero does not.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_running {
            return TickOutcome::unchanged(self.remaining_ms);
        }

        let outcome = clock::apply_tick(self.remaining_ms, self.speed);
        self.remaining_ms = outcome.remaining_ms;
        self.emit(TimerEvent::Tick {
            remaining_seconds: self.remaining_seconds(),
        });

        if outcome.expired {
            tracing::info!(mode = self.mode.as_str(), "countdown expired");
            self.emit(TimerEvent::Expired { mode: self.mode });
            self.advance();
        }

        outcome
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// Expiry-style transition shared by natural expiry and skip.
    fn advance(&mut self) {
        let next = match self.mode {
            TimerMode::Focus => {
                let completed = self.cycle_count + 1;
                if completed >= self.long_break_threshold() {
                    TimerMode::LongBreak
                } else {
                    self.config.break_type.mode()
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };

        if self.mode == TimerMode::Focus {
            match next {
                TimerMode::LongBreak => self.cycle_count = 0,
                TimerMode::ShortBreak => self.cycle_count = (self.cycle_count + 1) % CYCLE_MODULUS,
                TimerMode::Focus => {}
            }
        }

        self.enter(next);
    }

    /// Focus completions that force a long break.
    ///
    /// The counter wraps at 4, so thresholds above 4 behave as 4.
    fn long_break_threshold(&self) -> u8 {
        self.config
            .cycles_before_long_break
            .clamp(1, u32::from(CYCLE_MODULUS)) as u8
    }

    fn enter(&mut self, mode: TimerMode) {
        let from = self.mode;
        self.mode = mode;
        self.remaining_ms = self.config.millis_for(mode);
        self.is_running = self.auto_advance;

        tracing::info!(
            from = from.as_str(),
            to = mode.as_str(),
            cycle_count = self.cycle_count,
            running = self.is_running,
            "mode changed"
        );
        self.emit(TimerEvent::ModeChanged {
            from,
            to: mode,
            cycle_count: self.cycle_count,
            auto_started: self.is_running,
        });
    }

    fn emit(&self, event: TimerEvent) {
        if self.event_tx.send(event).is_err() {
            tracing::trace!("no event receiver");
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Returns the current mode.
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Returns the remaining time rounded up to whole seconds.
    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }

    /// Returns the remaining time in milliseconds.
    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    /// Returns true while counting down.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Returns the tick rate scale.
    pub fn speed_multiplier(&self) -> f64 {
        self.speed
    }

    /// Returns completed focus sessions since the last long break.
    pub fn cycle_count(&self) -> u8 {
        self.cycle_count
    }

    /// Returns true if the next mode starts automatically.
    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Returns the elapsed fraction of the current mode.
    pub fn progress(&self) -> f64 {
        // durations are validated to be positive
        let total = self.config.millis_for(self.mode) as f64;
        (1.0 - self.remaining_ms as f64 / total).clamp(0.0, 1.0)
    }

    /// Returns an immutable view of the current state.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            remaining_seconds: self.remaining_seconds(),
            remaining_ms: self.remaining_ms,
            is_running: self.is_running,
            cycle_count: self.cycle_count,
            progress: self.progress(),
            speed_multiplier: self.speed,
            auto_advance: self.auto_advance,
        }
    }

    /// Overwrites the remaining time (for testing).
    #[cfg(test)]
    pub(crate) fn set_remaining_ms(&mut self, remaining_ms: u64) {
        self.remaining_ms = remaining_ms;
    }
}

// ============================================================================
// Tests
// ============================================================================
