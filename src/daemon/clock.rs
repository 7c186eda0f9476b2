//! Countdown clock for the timer engine.
//!
//! The clock knows nothing about modes. It has two halves:
//! - Tick arithmetic: how much one tick removes at a given speed
//! - Scheduling: a tokio task that fires every `1000ms / speed`
//!
//! Each scheduled tick is delivered as the id of the handle that produced
//! it, so the receiver can discard ticks from a handle that has since been
//! replaced.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Identifies one started clock.
pub type ClockId = u64;

/// Channel end the clock delivers ticks into.
pub type TickSender = mpsc::UnboundedSender<ClockId>;

/// Channel end ticks are read from.
pub type TickReceiver = mpsc::UnboundedReceiver<ClockId>;

/// Shortest tick period, however large the speed multiplier.
const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Longest tick period, however small the speed multiplier.
const MAX_TICK_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Tick arithmetic
// ============================================================================

/// Result of applying one tick to a remaining time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Remaining time after the tick
    pub remaining_ms: u64,
    /// True only for the tick that moved a nonzero value to zero
    pub expired: bool,
}

impl TickOutcome {
    /// Outcome for a tick that changed nothing.
    pub fn unchanged(remaining_ms: u64) -> Self {
        Self {
            remaining_ms,
            expired: false,
        }
    }
}

/// Returns the time one tick removes at `speed`.
///
/// Remaining time has millisecond resolution: `speed` seconds are rounded
/// to the nearest millisecond, with a floor of 1 ms. Below a speed of
/// 0.0005 a tick therefore removes 1 ms rather than `speed` seconds.
pub fn tick_step_ms(speed: f64) -> u64 {
    // `as` saturates for huge products
    ((speed * 1000.0).round() as u64).max(1)
}

/// Returns the wall-clock period between ticks at `speed`.
pub fn tick_period(speed: f64) -> Duration {
    Duration::try_from_secs_f64(1.0 / speed)
        .unwrap_or(MAX_TICK_PERIOD)
        .clamp(MIN_TICK_PERIOD, MAX_TICK_PERIOD)
}

/// Applies one tick: `max(remaining - speed, 0)`.
pub fn apply_tick(remaining_ms: u64, speed: f64) -> TickOutcome {
    let next = remaining_ms.saturating_sub(tick_step_ms(speed));
    TickOutcome {
        remaining_ms: next,
        expired: remaining_ms > 0 && next == 0,
    }
}

// ============================================================================
// ClockHandle
// ============================================================================

/// Handle to a running tick source. Dropping it stops the clock.
#[derive(Debug)]
pub struct ClockHandle {
    id: ClockId,
    speed: f64,
    task: Option<JoinHandle<()>>,
}

impl ClockHandle {
    /// Returns the id delivered with every tick of this clock.
    pub fn id(&self) -> ClockId {
        self.id
    }

    /// Returns the speed the clock was started with.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Returns true until the clock is stopped.
    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        CountdownClock::stop(self);
    }
}

// ============================================================================
// CountdownClock
// ============================================================================

/// Starts and stops repeating tick sources.
pub struct CountdownClock;

impl CountdownClock {
    /// Starts a clock that sends `id` into `on_tick` every `1000ms / speed`.
    ///
    /// The first tick arrives one full period after start. The task ends on
    /// its own once the receiving side is gone.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(id: ClockId, on_tick: TickSender, speed: f64) -> ClockHandle {
        let period = tick_period(speed);
        tracing::debug!(id, speed, period_ms = period.as_millis() as u64, "clock started");

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if on_tick.send(id).is_err() {
                    break;
                }
            }
        });

        ClockHandle {
            id,
            speed,
            task: Some(task),
        }
    }

    /// Cancels future ticks. Stopping an already stopped handle is a no-op.
    pub fn stop(handle: &mut ClockHandle) {
        if let Some(task) = handle.task.take() {
            task.abort();
            tracing::debug!(id = handle.id, "clock stopped");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
