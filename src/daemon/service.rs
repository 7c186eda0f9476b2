//! Timer service: the engine plus its live clock.
//!
//! The service owns the engine and at most one [`ClockHandle`] behind a
//! single async mutex. Every intent and every tick runs under that lock,
//! then the clock is reconciled with the engine's run state and speed:
//! - not running: no clock
//! - running: exactly one clock at the current speed
//!
//! Ticks carry the id of the clock that produced them. A tick from a clock
//! that is no longer live, or one that arrives while paused, is dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};

use crate::types::{ConfigPatch, TimerConfig, TimerMode, TimerSnapshot};

use super::clock::{ClockHandle, ClockId, CountdownClock, TickReceiver, TickSender};
use super::error::EngineError;
use super::timer::TimerEngine;

// ============================================================================
// Session
// ============================================================================

struct Session {
    engine: TimerEngine,
    clock: Option<ClockHandle>,
    last_clock_id: ClockId,
}

impl Session {
    fn live_clock_id(&self) -> Option<ClockId> {
        self.clock.as_ref().map(ClockHandle::id)
    }

    /// Brings the clock in line with the engine's run state and speed.
    fn sync_clock(&mut self, tick_tx: &TickSender) {
        if !self.engine.is_running() {
            if let Some(mut clock) = self.clock.take() {
                CountdownClock::stop(&mut clock);
            }
            return;
        }

        let speed = self.engine.speed_multiplier();
        if self.clock.as_ref().is_some_and(|clock| clock.speed() == speed) {
            return;
        }

        if let Some(mut old) = self.clock.take() {
            CountdownClock::stop(&mut old);
        }
        self.last_clock_id += 1;
        self.clock = Some(CountdownClock::start(self.last_clock_id, tick_tx.clone(), speed));
    }
}

// ============================================================================
// TimerService
// ============================================================================

/// Shared handle to the engine and its clock.
#[derive(Clone)]
pub struct TimerService {
    session: Arc<Mutex<Session>>,
    tick_tx: TickSender,
    snapshot_tx: Arc<watch::Sender<TimerSnapshot>>,
}

impl TimerService {
    /// Wraps `engine`. The returned receiver must be driven by [`TimerService::run`].
    pub fn new(engine: TimerEngine) -> (Self, TickReceiver) {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(engine.snapshot());

        let service = Self {
            session: Arc::new(Mutex::new(Session {
                engine,
                clock: None,
                last_clock_id: 0,
            })),
            tick_tx,
            snapshot_tx: Arc::new(snapshot_tx),
        };
        (service, tick_rx)
    }

    /// Applies clock ticks until the tick channel closes.
    ///
    /// This should be spawned as a separate tokio task.
    pub async fn run(&self, mut ticks: TickReceiver) {
        while let Some(id) = ticks.recv().await {
            self.handle_tick(id).await;
        }
    }

    /// Applies a single tick from clock `id`.
    ///
    /// Returns `None` if the tick was stale and therefore ignored.
    pub async fn handle_tick(&self, id: ClockId) -> Option<TimerSnapshot> {
        let mut session = self.session.lock().await;

        if session.live_clock_id() != Some(id) || !session.engine.is_running() {
            tracing::trace!(id, "stale tick ignored");
            return None;
        }

        session.engine.tick();
        session.sync_clock(&self.tick_tx);

        let snapshot = session.engine.snapshot();
        self.publish(&snapshot);
        Some(snapshot)
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Returns the current state.
    pub async fn snapshot(&self) -> TimerSnapshot {
        self.session.lock().await.engine.snapshot()
    }

    /// Returns the active configuration.
    pub async fn configuration(&self) -> TimerConfig {
        self.session.lock().await.engine.config().clone()
    }

    /// Returns true while a clock is scheduled.
    pub async fn has_live_clock(&self) -> bool {
        self.session
            .lock()
            .await
            .clock
            .as_ref()
            .is_some_and(ClockHandle::is_active)
    }

    // ------------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------------

    /// Starts or pauses the countdown.
    pub async fn toggle_run(&self) -> TimerSnapshot {
        self.apply(TimerEngine::toggle_run).await
    }

    /// Stops and restores the current mode's duration.
    pub async fn reset(&self) -> TimerSnapshot {
        self.apply(TimerEngine::reset).await
    }

    /// Moves to the next mode.
    pub async fn skip(&self) -> TimerSnapshot {
        self.apply(TimerEngine::skip).await
    }

    /// Changes the speed, rebinding the clock if running.
    pub async fn set_speed(&self, multiplier: f64) -> Result<TimerSnapshot, EngineError> {
        self.try_apply(|engine| engine.set_speed(multiplier)).await
    }

    /// Switches mode manually.
    pub async fn set_mode(&self, mode: TimerMode) -> TimerSnapshot {
        self.apply(|engine| engine.set_mode(mode)).await
    }

    /// Overrides the cycle counter.
    pub async fn update_cycle(&self, count: i64) -> TimerSnapshot {
        self.apply(|engine| engine.update_cycle(count)).await
    }

    /// Replaces the configuration.
    pub async fn apply_configuration(
        &self,
        config: TimerConfig,
    ) -> Result<TimerSnapshot, EngineError> {
        self.try_apply(|engine| engine.apply_configuration(config)).await
    }

    /// Applies a partial configuration update.
    ///
    /// Returns the snapshot together with the configuration that was
    /// accepted, both read under the same lock.
    pub async fn apply_patch(
        &self,
        patch: &ConfigPatch,
    ) -> Result<(TimerSnapshot, TimerConfig), EngineError> {
        let mut session = self.session.lock().await;
        let snapshot = session.engine.apply_patch(patch)?;
        let config = session.engine.config().clone();
        session.sync_clock(&self.tick_tx);
        self.publish(&snapshot);
        Ok((snapshot, config))
    }

    /// Enables or disables auto-advance.
    pub async fn set_auto_advance(&self, enabled: bool) -> TimerSnapshot {
        self.apply(|engine| engine.set_auto_advance(enabled)).await
    }

    async fn apply<F>(&self, op: F) -> TimerSnapshot
    where
        F: FnOnce(&mut TimerEngine) -> TimerSnapshot,
    {
        let mut session = self.session.lock().await;
        let snapshot = op(&mut session.engine);
        session.sync_clock(&self.tick_tx);
        self.publish(&snapshot);
        snapshot
    }

    async fn try_apply<F>(&self, op: F) -> Result<TimerSnapshot, EngineError>
    where
        F: FnOnce(&mut TimerEngine) -> Result<TimerSnapshot, EngineError>,
    {
        let mut session = self.session.lock().await;
        let snapshot = op(&mut session.engine)?;
        session.sync_clock(&self.tick_tx);
        self.publish(&snapshot);
        Ok(snapshot)
    }

    fn publish(&self, snapshot: &TimerSnapshot) {
        self.snapshot_tx.send_replace(snapshot.clone());
    }
}

// ============================================================================
// Tests
// ============================================================================
