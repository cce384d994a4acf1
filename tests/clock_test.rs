//! Integration tests: clock arithmetic over full move sequences.
//!
//! Walks a clock and its time control through realistic operator
//! sessions: thinking time, increments on commit, drift correction
//! when the two sides search in different modes, and pauses.

use chrono::{DateTime, Duration, Utc};
use podium_core::{side_index, Clock, TimeControl};
use shakmaty::Color;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn after(base: DateTime<Utc>, ms: i64) -> DateTime<Utc> {
    base + Duration::milliseconds(ms)
}

fn control(drift_ms: f64) -> TimeControl {
    TimeControl {
        start_ms: 300_000.0,
        increment_ms: 15_000.0,
        drift_ms,
    }
}

/// Charge `ms` of thinking to `side`, then credit its increment and
/// hand the move timer to the other side, as a committed move does.
fn commit_after(
    clock: &mut Clock,
    control: &TimeControl,
    timed: [bool; 2],
    side: Color,
    now: DateTime<Utc>,
) {
    clock.tick(side, now);
    clock.apply_increment(side, control.increment_for(side, timed));
    clock.reset_move_timer(!side);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_both_timed_game_walkthrough() {
    // 300s + 15s, both sides timed: ten seconds of thought nets +5s.
    let control = control(0.0);
    let timed = [true, true];
    let mut clock = Clock::new(control.start_ms);
    clock.arm(t0());

    let m1 = after(t0(), 10_000);
    commit_after(&mut clock, &control, timed, Color::White, m1);
    assert_eq!(clock.remaining_ms(Color::White), 305_000.0);
    assert_eq!(clock.move_elapsed_ms(Color::Black), 0.0);

    let m2 = after(m1, 4_000);
    commit_after(&mut clock, &control, timed, Color::Black, m2);
    assert_eq!(clock.remaining_ms(Color::Black), 311_000.0);
    assert_eq!(clock.move_elapsed_ms(Color::White), 0.0);

    // White burns 20s over several samples before moving again.
    clock.tick(Color::White, after(m2, 8_000));
    clock.tick(Color::White, after(m2, 17_500));
    commit_after(&mut clock, &control, timed, Color::White, after(m2, 20_000));
    assert_eq!(clock.remaining_ms(Color::White), 300_000.0);
    assert_eq!(clock.remaining_ms(Color::Black), 311_000.0);
}

#[test]
fn test_mixed_modes_apply_drift_to_both_sides() {
    // White timed against an untrusted external clock: White's
    // increment shrinks by the drift, Black's grows by it.
    let control = control(500.0);
    let timed = [true, false];
    let mut clock = Clock::new(control.start_ms);
    clock.arm(t0());

    let m1 = after(t0(), 10_000);
    commit_after(&mut clock, &control, timed, Color::White, m1);
    assert_eq!(clock.remaining_ms(Color::White), 304_500.0);

    let m2 = after(m1, 10_000);
    commit_after(&mut clock, &control, timed, Color::Black, m2);
    assert_eq!(clock.remaining_ms(Color::Black), 305_500.0);
}

#[test]
fn test_drift_bounds_hold_for_any_magnitude() {
    for timed in [[true, false], [false, true]] {
        for drift in [-120_000.0, -15_000.0, -1.0, 0.0, 1.0, 15_000.0, 120_000.0] {
            let c = control(drift);
            for side in [Color::White, Color::Black] {
                let inc = c.increment_for(side, timed);
                assert!(inc >= 0.0, "drift {drift} produced negative increment");
                assert!(
                    inc <= 2.0 * c.increment_ms,
                    "drift {drift} exceeded twice the increment"
                );
            }
            // The corrections cancel out pairwise while unclamped.
            if drift.abs() <= c.increment_ms {
                let white = c.increment_for(Color::White, timed);
                let black = c.increment_for(Color::Black, timed);
                assert_eq!(white + black, 2.0 * c.increment_ms);
            }
        }
    }
}

#[test]
fn test_matching_modes_never_see_drift() {
    let c = control(7_500.0);
    for timed in [[true, true], [false, false]] {
        assert_eq!(c.increment_for(Color::White, timed), 15_000.0);
        assert_eq!(c.increment_for(Color::Black, timed), 15_000.0);
    }
}

#[test]
fn test_elapsed_time_is_conserved_across_samples() {
    let mut clock = Clock::new(600_000.0);
    clock.arm(t0());

    let samples = [
        (Color::White, 1_250_i64),
        (Color::White, 740),
        (Color::Black, 3_333),
        (Color::White, 12),
        (Color::Black, 908),
        (Color::Black, 4_001),
    ];
    let mut now = t0();
    let mut charged = [0.0_f64; 2];
    for (side, ms) in samples {
        now = after(now, ms);
        clock.tick(side, now);
        charged[side_index(side)] += ms as f64;
    }

    assert_eq!(clock.remaining_ms(Color::White), 600_000.0 - charged[0]);
    assert_eq!(clock.remaining_ms(Color::Black), 600_000.0 - charged[1]);
    assert_eq!(clock.move_elapsed_ms(Color::White), charged[0]);
    assert_eq!(clock.move_elapsed_ms(Color::Black), charged[1]);
}

#[test]
fn test_pause_and_resume_mid_game() {
    let mut clock = Clock::new(300_000.0);
    clock.arm(t0());
    clock.tick(Color::White, after(t0(), 2_000));

    // Arbiter pauses the game; the flag flips but time stops flowing.
    clock.disarm();
    assert!(!clock.is_armed());
    clock.tick(Color::White, after(t0(), 200_000));
    assert_eq!(clock.remaining_ms(Color::White), 298_000.0);

    // Resume half an hour later and play on.
    let resume = after(t0(), 1_800_000);
    clock.arm(resume);
    clock.tick(Color::White, after(resume, 3_000));
    assert_eq!(clock.remaining_ms(Color::White), 295_000.0);
}

#[test]
fn test_operator_adjustment_during_play() {
    let mut clock = Clock::new(300_000.0);
    clock.arm(t0());
    clock.tick(Color::Black, after(t0(), 5_000));

    // Correct Black's clock to match the physical board clock.
    clock.adjust(Color::Black, -42_000.0);
    assert_eq!(clock.remaining_ms(Color::Black), 253_000.0);

    clock.tick(Color::Black, after(t0(), 6_000));
    assert_eq!(clock.remaining_ms(Color::Black), 252_000.0);
    assert!(!clock.is_overrun(Color::Black));

    clock.adjust(Color::Black, -300_000.0);
    assert!(clock.is_overrun(Color::Black));
}
