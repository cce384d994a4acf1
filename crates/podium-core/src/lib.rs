//! Core domain types for the tournament operator console.

pub mod analysis;
pub mod clock;
pub mod game;
pub mod state;
pub mod uci;

pub use analysis::{AnalysisSnapshot, AnalysisUpdate, AnalysisWindow, MoveInfo, Score, Wdl};
pub use clock::{side_index, Clock, TimeControl};
pub use game::{normalized_fen, GameError, GameState};
pub use state::{Intent, MoveAnnotation, OrchestrationState, STATUS_IDLE, STATUS_STOPPED};
