//! Scenario tests for the timer engine through the public API.
//!
//! - Focus → break → focus cycling with the cycle counter
//! - Forced long break after four focus sessions
//! - Speed scaling down to expiry
//! - Configuration changes while running

use tokio::sync::mpsc;

use pomodash::daemon::timer::{TimerEngine, TimerEvent};
use pomodash::types::{BreakType, TimerConfig, TimerMode};

// ============================================================================
// Test Helpers
// ============================================================================

fn create_engine(config: TimerConfig) -> (TimerEngine, mpsc::UnboundedReceiver<TimerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TimerEngine::new(config, tx), rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<TimerEvent>) -> Vec<TimerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// Cycling
// ============================================================================

#[test]
fn skip_from_focus_enters_short_break() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());
    assert_eq!(engine.remaining_seconds(), 1500);

    let snapshot = engine.skip();

    assert_eq!(snapshot.mode, TimerMode::ShortBreak);
    assert_eq!(snapshot.remaining_seconds, 300);
    assert_eq!(snapshot.cycle_count, 1);
}

#[test]
fn fourth_focus_completion_forces_long_break() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());

    for expected in 1..=3 {
        let snapshot = engine.skip();
        assert_eq!(snapshot.mode, TimerMode::ShortBreak);
        assert_eq!(snapshot.cycle_count, expected);

        let snapshot = engine.skip();
        assert_eq!(snapshot.mode, TimerMode::Focus);
        assert_eq!(snapshot.remaining_seconds, 1500);
    }

    let snapshot = engine.skip();
    assert_eq!(snapshot.mode, TimerMode::LongBreak);
    assert_eq!(snapshot.cycle_count, 0);
    assert_eq!(snapshot.remaining_seconds, 900);

    let snapshot = engine.skip();
    assert_eq!(snapshot.mode, TimerMode::Focus);
    assert_eq!(snapshot.cycle_count, 0);
}

#[test]
fn long_break_type_always_takes_long_break() {
    let (mut engine, _rx) =
        create_engine(TimerConfig::default().with_break_type(BreakType::Long));
    engine.update_cycle(2);

    let snapshot = engine.skip();

    assert_eq!(snapshot.mode, TimerMode::LongBreak);
    assert_eq!(snapshot.cycle_count, 0);
}

#[test]
fn lower_cycle_threshold_forces_long_break_sooner() {
    let (mut engine, _rx) =
        create_engine(TimerConfig::default().with_cycles_before_long_break(2));

    assert_eq!(engine.skip().mode, TimerMode::ShortBreak);
    engine.skip();
    assert_eq!(engine.skip().mode, TimerMode::LongBreak);
}

#[test]
fn natural_expiry_transitions_and_reports_events() {
    let (mut engine, mut rx) = create_engine(TimerConfig::default().with_focus_minutes(1));
    engine.toggle_run();
    engine.set_speed(60.0).unwrap();
    drain(&mut rx);

    let outcome = engine.tick();

    assert!(outcome.expired);
    assert_eq!(engine.mode(), TimerMode::ShortBreak);
    assert!(engine.is_running());

    let events = drain(&mut rx);
    assert!(events.contains(&TimerEvent::Expired {
        mode: TimerMode::Focus
    }));
    assert!(events.contains(&TimerEvent::ModeChanged {
        from: TimerMode::Focus,
        to: TimerMode::ShortBreak,
        cycle_count: 1,
        auto_started: true,
    }));
}

// ============================================================================
// Speed
// ============================================================================

#[test]
fn speed_four_from_ten_seconds_expires_on_third_tick() {
    let (mut engine, _rx) = create_engine(TimerConfig::default().with_focus_minutes(1));
    engine.toggle_run();

    // 60s - 50s leaves 10s
    engine.set_speed(50.0).unwrap();
    engine.tick();
    assert_eq!(engine.remaining_seconds(), 10);

    engine.set_speed(4.0).unwrap();
    assert!(!engine.tick().expired);
    assert_eq!(engine.remaining_seconds(), 6);
    assert!(!engine.tick().expired);
    assert_eq!(engine.remaining_seconds(), 2);

    let outcome = engine.tick();
    assert!(outcome.expired);
    assert_eq!(outcome.remaining_ms, 0);
    assert_eq!(engine.mode(), TimerMode::ShortBreak);
}

#[test]
fn rejected_speed_keeps_previous() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());
    engine.set_speed(2.0).unwrap();

    for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = engine.set_speed(bad).unwrap_err();
        assert!(err.is_invalid_speed());
    }
    assert_eq!(engine.speed_multiplier(), 2.0);
}

#[test]
fn paused_engine_ignores_ticks() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());

    let outcome = engine.tick();

    assert!(!outcome.expired);
    assert_eq!(engine.remaining_seconds(), 1500);
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn configuration_while_running_applies_after_reset() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());
    engine.toggle_run();
    engine.tick();
    assert_eq!(engine.remaining_seconds(), 1499);

    engine
        .apply_configuration(TimerConfig::default().with_focus_minutes(50))
        .unwrap();
    assert_eq!(engine.remaining_seconds(), 1499);

    let snapshot = engine.reset();
    assert_eq!(snapshot.remaining_seconds, 3000);
    assert!(!snapshot.is_running);

    let again = engine.reset();
    assert_eq!(again, snapshot);
}

#[test]
fn configuration_while_idle_applies_immediately() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());

    let snapshot = engine
        .apply_configuration(TimerConfig::default().with_focus_minutes(10))
        .unwrap();

    assert_eq!(snapshot.remaining_seconds, 600);
}

#[test]
fn zero_duration_is_rejected() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());

    let err = engine
        .apply_configuration(TimerConfig::default().with_long_break_minutes(0))
        .unwrap_err();

    assert!(err.is_invalid_duration());
    assert_eq!(engine.config().long_break_minutes, 15);
}

#[test]
fn manual_mode_keeps_cycle_count() {
    let (mut engine, _rx) = create_engine(TimerConfig::default());
    engine.update_cycle(2);

    let snapshot = engine.set_mode(TimerMode::ShortBreak);

    assert_eq!(snapshot.mode, TimerMode::ShortBreak);
    assert_eq!(snapshot.cycle_count, 2);
    assert_eq!(snapshot.remaining_seconds, 300);
}
