//! Shared orchestration state and the operator intent vocabulary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shakmaty::Color;

use crate::analysis::{AnalysisWindow, Wdl};
use crate::clock::{side_index, Clock};
use crate::game::GameState;

pub const STATUS_IDLE: &str = "Not doing anything";
pub const STATUS_STOPPED: &str = "Stopped.";

/// Per-move marker shown next to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MoveAnnotation {
    Note(String),
    Wdl(Wdl),
}

impl MoveAnnotation {
    /// Annotation for a committed move from whatever the analysis
    /// window knows about it.
    pub fn from_window(window: &AnalysisWindow, uci: &str) -> Self {
        window
            .wdl_for_move(uci)
            .or_else(|| window.best_wdl())
            .map(MoveAnnotation::Wdl)
            .unwrap_or_else(|| MoveAnnotation::Note("(unknown)".to_string()))
    }
}

impl fmt::Display for MoveAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveAnnotation::Note(note) => write!(f, "{note}"),
            MoveAnnotation::Wdl(wdl) => write!(f, "{wdl}"),
        }
    }
}

/// One operator action, already decoded from the input surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    ToggleEngine,
    ToggleTimed(Color),
    ToggleTimer,
    AdjustClock { side: Color, delta_ms: f64 },
    PushPending(char),
    PopPending,
    ClearPending,
    Commit,
    Undo,
    ForceMove,
    SetPromotion(char),
    Flip,
    CycleTheme,
    AckMoveReady,
}

/// Everything the console tracks between ticks. This is the unit of
/// persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub game: GameState,
    pub clock: Clock,
    /// Per side: search with clock limits (true) or infinite (false).
    pub timed_search: [bool; 2],
    /// Piece chosen for four-character promotions, always uppercase.
    pub promotion: char,
    pub engine_enabled: bool,
    pub force_move: bool,
    pub undo_requested: bool,
    pub commit_requested: bool,
    /// An engine move landed and has not been acknowledged yet.
    pub move_ready: bool,
    pub flipped: bool,
    pub theme: u8,
    pub statusbar: String,
    pub engine_status: String,
    pub annotations: Vec<MoveAnnotation>,
}

impl OrchestrationState {
    pub fn new(start_ms: f64) -> Self {
        Self {
            game: GameState::new(),
            clock: Clock::new(start_ms),
            timed_search: [true, false],
            promotion: 'Q',
            engine_enabled: false,
            force_move: false,
            undo_requested: false,
            commit_requested: false,
            move_ready: false,
            flipped: false,
            theme: 0,
            statusbar: String::new(),
            engine_status: STATUS_IDLE.to_string(),
            annotations: Vec::new(),
        }
    }

    /// Apply one intent, returning whether anything changed.
    ///
    /// Commit, undo, and force-move only raise request flags here; the
    /// orchestrator consumes them on its next tick so they serialize
    /// against the engine session.
    pub fn apply_intent(&mut self, intent: Intent, now: DateTime<Utc>) -> bool {
        match intent {
            Intent::ToggleEngine => {
                self.engine_enabled = !self.engine_enabled;
                true
            }
            Intent::ToggleTimed(side) => {
                let i = side_index(side);
                self.timed_search[i] = !self.timed_search[i];
                true
            }
            Intent::ToggleTimer => {
                if self.clock.is_armed() {
                    self.clock.disarm();
                } else {
                    self.clock.arm(now);
                }
                true
            }
            Intent::AdjustClock { side, delta_ms } => {
                self.clock.adjust(side, delta_ms);
                true
            }
            Intent::PushPending(c) => self.game.push_pending(c),
            Intent::PopPending => self.game.pop_pending(),
            Intent::ClearPending => self.game.clear_pending(),
            Intent::Commit => {
                self.commit_requested = true;
                true
            }
            Intent::Undo => {
                self.undo_requested = true;
                true
            }
            Intent::ForceMove => {
                self.force_move = true;
                true
            }
            Intent::SetPromotion(c) => {
                let upper = c.to_ascii_uppercase();
                if matches!(upper, 'Q' | 'R' | 'B' | 'N') {
                    self.promotion = upper;
                    true
                } else {
                    false
                }
            }
            Intent::Flip => {
                self.flipped = !self.flipped;
                true
            }
            Intent::CycleTheme => {
                self.theme = self.theme.wrapping_add(1);
                true
            }
            Intent::AckMoveReady => {
                if self.move_ready {
                    self.move_ready = false;
                    true
                } else {
                    false
                }
            }
        }
    }
}
