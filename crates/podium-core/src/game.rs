//! Game position, move history, and the pending move entry buffer.

use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, Color, EnPassantMode, Position, Rank, Role, Square};
use thiserror::Error;

/// Longest operator entry: four squares chars plus a promotion piece.
const PENDING_MAX: usize = 5;

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Malformed move: {0}")]
    MalformedMove(String),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

/// Drop the clocks from a FEN so repeats of a position compare equal.
pub fn normalized_fen(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

fn position_fen(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

fn replay(moves: &[String]) -> Result<Chess, GameError> {
    let mut position = Chess::default();
    for uci in moves {
        let parsed: UciMove = uci
            .parse()
            .map_err(|_| GameError::MalformedMove(uci.clone()))?;
        let mv = parsed
            .to_move(&position)
            .map_err(|_| GameError::IllegalMove(uci.clone()))?;
        position.play_unchecked(mv);
    }
    Ok(position)
}

/// Position plus the history that produced it.
///
/// Only the move list and the pending buffer are serialized; the
/// position is rebuilt by replaying from the start on load, which also
/// rejects histories that no longer parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GameRecord", into = "GameRecord")]
pub struct GameState {
    position: Chess,
    moves: Vec<String>,
    pending: String,
}

#[derive(Serialize, Deserialize)]
struct GameRecord {
    moves: Vec<String>,
    pending: String,
}

impl TryFrom<GameRecord> for GameState {
    type Error = GameError;

    fn try_from(record: GameRecord) -> Result<Self, GameError> {
        let position = replay(&record.moves)?;
        Ok(Self {
            position,
            moves: record.moves,
            pending: record.pending,
        })
    }
}

impl From<GameState> for GameRecord {
    fn from(state: GameState) -> Self {
        Self {
            moves: state.moves,
            pending: state.pending,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        Self {
            position: Chess::default(),
            moves: Vec::new(),
            pending: String::new(),
        }
    }

    /// Validate and play a UCI move, recording the normalized string.
    ///
    /// A four-character entry that moves a pawn onto the last rank is
    /// completed with a queen promotion before validation. On error the
    /// position and history are unchanged.
    pub fn apply_uci(&mut self, uci: &str) -> Result<(), GameError> {
        if uci.len() < 4 || uci.len() > PENDING_MAX {
            return Err(GameError::MalformedMove(uci.to_string()));
        }
        let mut entry = uci.to_string();
        if entry.len() == 4 && self.needs_promotion_suffix(&entry) {
            entry.push('q');
        }
        let parsed: UciMove = entry
            .parse()
            .map_err(|_| GameError::MalformedMove(entry.clone()))?;
        let mv = parsed
            .to_move(&self.position)
            .map_err(|_| GameError::IllegalMove(entry.clone()))?;
        self.position.play_unchecked(mv);
        self.moves.push(entry);
        self.pending.clear();
        Ok(())
    }

    /// True when a four-character entry pushes a pawn onto the last
    /// rank and so needs a promotion piece appended. Anything that does
    /// not split into two squares, multi-byte input included, is left
    /// alone.
    pub fn needs_promotion_suffix(&self, entry: &str) -> bool {
        let (Some(Ok(from)), Some(Ok(to))) = (
            entry.get(0..2).map(str::parse::<Square>),
            entry.get(2..4).map(str::parse::<Square>),
        ) else {
            return false;
        };
        if self.position.board().role_at(from) != Some(Role::Pawn) {
            return false;
        }
        let last_rank = match self.position.turn() {
            Color::White => Rank::Eighth,
            Color::Black => Rank::First,
        };
        to.rank() == last_rank
    }

    /// Retract the last committed move, returning it, or None when the
    /// history is empty. A half-typed pending entry is discarded along
    /// with the retracted move.
    pub fn undo(&mut self) -> Option<String> {
        let popped = self.moves.pop()?;
        match replay(&self.moves) {
            Ok(position) => {
                self.position = position;
                self.pending.clear();
                Some(popped)
            }
            Err(_) => {
                self.moves.push(popped);
                None
            }
        }
    }

    /// Append a character to the pending entry. Letters are lowered so
    /// keyed input matches UCI. Returns false once the buffer is full.
    pub fn push_pending(&mut self, c: char) -> bool {
        if self.pending.len() >= PENDING_MAX {
            return false;
        }
        self.pending.push(c.to_ascii_lowercase());
        true
    }

    pub fn pop_pending(&mut self) -> bool {
        self.pending.pop().is_some()
    }

    pub fn clear_pending(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        self.pending.clear();
        true
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    pub fn side_to_move(&self) -> Color {
        self.position.turn()
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn fen(&self) -> String {
        position_fen(&self.position)
    }

    pub fn uci_moves(&self) -> &[String] {
        &self.moves
    }

    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Checkmate or stalemate; the game cannot continue.
    pub fn is_terminal(&self) -> bool {
        self.position.is_checkmate() || self.position.is_stalemate()
    }

    pub fn outcome_label(&self) -> Option<String> {
        if self.position.is_checkmate() {
            let winner = match self.position.turn() {
                Color::White => "Black",
                Color::Black => "White",
            };
            Some(format!("Checkmate, {winner} wins"))
        } else if self.position.is_stalemate() {
            Some("Stalemate".to_string())
        } else {
            None
        }
    }

    /// Times the current position has occurred, counting the start
    /// position and the present one.
    pub fn repetition_count(&self) -> usize {
        let target = normalized_fen(&self.fen());
        let mut position = Chess::default();
        let mut count = usize::from(normalized_fen(&position_fen(&position)) == target);
        for uci in &self.moves {
            let Ok(parsed) = uci.parse::<UciMove>() else {
                return count;
            };
            let Ok(mv) = parsed.to_move(&position) else {
                return count;
            };
            position.play_unchecked(mv);
            if normalized_fen(&position_fen(&position)) == target {
                count += 1;
            }
        }
        count
    }

    pub fn can_claim_threefold(&self) -> bool {
        self.repetition_count() >= 3
    }

    pub fn can_claim_fifty_moves(&self) -> bool {
        self.position.halfmoves() >= 100
    }

    pub fn has_insufficient_material(&self) -> bool {
        self.position.is_insufficient_material()
    }

    /// One-line summary of claimable draws for the status bar, empty
    /// when nothing is claimable.
    pub fn claims_summary(&self) -> String {
        let mut claims = Vec::new();
        if self.can_claim_threefold() {
            claims.push("threefold repetition");
        }
        if self.can_claim_fifty_moves() {
            claims.push("fifty-move rule");
        }
        if self.has_insufficient_material() {
            claims.push("insufficient material");
        }
        if claims.is_empty() {
            String::new()
        } else {
            format!("Draw claimable: {}", claims.join(", "))
        }
    }
}
