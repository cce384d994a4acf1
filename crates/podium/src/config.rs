//! Console configuration from environment variables

use std::env;

use podium_core::TimeControl;

use crate::error::ConsoleError;

#[derive(Clone, Debug)]
pub struct Config {
    /// Path to the UCI engine binary
    pub engine_path: String,

    /// Extra arguments passed to the engine
    pub engine_args: Vec<String>,

    /// Working directory for the engine process (weights, nets)
    pub engine_dir: Option<String>,

    /// Directory for snapshots and other console data
    pub data_dir: String,

    /// Path to the binary opening book, if one is available
    pub book_path: Option<String>,

    /// Starting time per side in milliseconds
    pub start_time_ms: f64,

    /// Increment per committed move in milliseconds
    pub increment_ms: f64,

    /// Per-side increment correction when search modes differ
    pub drift_ms: f64,

    /// Candidate lines requested from the engine
    pub multipv: u32,

    /// Orchestration tick cadence in milliseconds
    pub tick_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConsoleError> {
        let engine_path =
            env::var("ENGINE_PATH").map_err(|_| ConsoleError::Config("ENGINE_PATH not set"))?;

        let engine_args = env::var("ENGINE_ARGS")
            .map(|v| v.split_whitespace().map(String::from).collect())
            .unwrap_or_default();

        let engine_dir = env::var("ENGINE_DIR").ok();

        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let book_path = env::var("BOOK_PATH").ok();

        let start_time_ms = env::var("START_TIME_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3_600_000.0);

        let increment_ms = env::var("INCREMENT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15_000.0);

        let drift_ms = env::var("TIMER_DRIFT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);

        let multipv = env::var("MULTIPV")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let tick_ms = env::var("TICK_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);

        Ok(Self {
            engine_path,
            engine_args,
            engine_dir,
            data_dir,
            book_path,
            start_time_ms,
            increment_ms,
            drift_ms,
            multipv,
            tick_ms,
        })
    }

    pub fn time_control(&self) -> TimeControl {
        TimeControl {
            start_ms: self.start_time_ms,
            increment_ms: self.increment_ms,
            drift_ms: self.drift_ms,
        }
    }
}
