//! Dual chess clock with fractional-millisecond accounting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shakmaty::Color;

/// Index into per-side arrays: White is 0, Black is 1.
pub fn side_index(color: Color) -> usize {
    match color {
        Color::White => 0,
        Color::Black => 1,
    }
}

/// Base time, increment, and the per-side drift correction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeControl {
    pub start_ms: f64,
    pub increment_ms: f64,
    pub drift_ms: f64,
}

impl TimeControl {
    /// Increment credited to `side` after a committed move.
    ///
    /// When both sides run the same search mode the plain increment
    /// applies. When the modes differ, the side whose mode matches
    /// White's receives `increment - drift` and the other side
    /// `increment + drift`, each clamped to `[0, 2 * increment]`.
    pub fn increment_for(&self, side: Color, timed: [bool; 2]) -> f64 {
        if timed[0] == timed[1] {
            return self.increment_ms;
        }
        let raw = if timed[side_index(side)] == timed[0] {
            self.increment_ms - self.drift_ms
        } else {
            self.increment_ms + self.drift_ms
        };
        raw.clamp(0.0, 2.0 * self.increment_ms)
    }
}

fn duration_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1000.0,
        None => delta.num_milliseconds() as f64,
    }
}

/// Two countdown timers of which at most one burns at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    remaining_ms: [f64; 2],
    move_elapsed_ms: [f64; 2],
    armed: bool,
    /// Not persisted: a restored clock re-baselines on its first tick
    /// instead of billing the downtime.
    #[serde(skip)]
    last_sample: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            remaining_ms: [start_ms, start_ms],
            move_elapsed_ms: [0.0, 0.0],
            armed: false,
            last_sample: None,
        }
    }

    /// Charge elapsed wall time to `side` and advance the sample point.
    ///
    /// While disarmed only the sample point moves, so idle time is
    /// never billed retroactively on rearm.
    pub fn tick(&mut self, side: Color, now: DateTime<Utc>) {
        if let (true, Some(last)) = (self.armed, self.last_sample) {
            let elapsed = duration_ms(last, now).max(0.0);
            let i = side_index(side);
            self.remaining_ms[i] -= elapsed;
            self.move_elapsed_ms[i] += elapsed;
        }
        self.last_sample = Some(now);
    }

    pub fn arm(&mut self, now: DateTime<Utc>) {
        self.armed = true;
        self.last_sample = Some(now);
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn apply_increment(&mut self, side: Color, increment_ms: f64) {
        self.remaining_ms[side_index(side)] += increment_ms;
    }

    /// Manual operator correction, positive or negative.
    pub fn adjust(&mut self, side: Color, delta_ms: f64) {
        self.remaining_ms[side_index(side)] += delta_ms;
    }

    pub fn reset_move_timer(&mut self, side: Color) {
        self.move_elapsed_ms[side_index(side)] = 0.0;
    }

    pub fn remaining_ms(&self, side: Color) -> f64 {
        self.remaining_ms[side_index(side)]
    }

    pub fn move_elapsed_ms(&self, side: Color) -> f64 {
        self.move_elapsed_ms[side_index(side)]
    }

    /// Remaining time may go negative; overrun is reported, not enforced.
    pub fn is_overrun(&self, side: Color) -> bool {
        self.remaining_ms[side_index(side)] < 0.0
    }
}
