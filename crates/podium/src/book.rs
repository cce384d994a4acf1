//! In-memory opening book.
//!
//! The book is loaded from a binary file at startup for instant lookups.
//! Use `cargo run --bin build-book` to generate the binary from a JSON
//! move list.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{Chess, EnPassantMode};

use podium_core::normalized_fen;

use crate::error::ConsoleError;

/// One weighted candidate move for a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookMove {
    pub uci: String,
    pub weight: u32,
}

/// The entire book: normalized FEN -> weighted candidates.
pub type BookEntries = HashMap<String, Vec<BookMove>>;

/// Opening book held in memory.
#[derive(Debug, Clone, Default)]
pub struct Book {
    entries: BookEntries,
}

impl Book {
    /// Load the book from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConsoleError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let entries: BookEntries = bincode::deserialize_from(reader)?;
        Ok(Self { entries })
    }

    pub fn from_entries(entries: BookEntries) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weighted random pick among the legal candidates for a position,
    /// or None when the position is out of book.
    pub fn pick(&self, position: &Chess) -> Option<String> {
        let fen = Fen::from_position(position, EnPassantMode::Legal).to_string();
        let candidates = self.entries.get(&normalized_fen(&fen))?;

        // Entries with zero weight or moves the position rejects are
        // skipped rather than trusted.
        let playable: Vec<&BookMove> = candidates
            .iter()
            .filter(|candidate| candidate.weight > 0)
            .filter(|candidate| {
                candidate
                    .uci
                    .parse::<UciMove>()
                    .is_ok_and(|parsed| parsed.to_move(position).is_ok())
            })
            .collect();
        if playable.is_empty() {
            return None;
        }

        let total: u32 = playable.iter().map(|candidate| candidate.weight).sum();
        let mut roll = rand::thread_rng().gen_range(0..total);
        for candidate in &playable {
            if roll < candidate.weight {
                return Some(candidate.uci.clone());
            }
            roll -= candidate.weight;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use shakmaty::Position;

    use super::*;

    fn entries_for_start(moves: &[(&str, u32)]) -> BookEntries {
        let fen = Fen::from_position(&Chess::default(), EnPassantMode::Legal).to_string();
        let candidates = moves
            .iter()
            .map(|(uci, weight)| BookMove {
                uci: uci.to_string(),
                weight: *weight,
            })
            .collect();
        let mut entries = BookEntries::new();
        entries.insert(normalized_fen(&fen), candidates);
        entries
    }

    #[test]
    fn test_pick_single_candidate() {
        let book = Book::from_entries(entries_for_start(&[("e2e4", 10)]));
        assert_eq!(book.pick(&Chess::default()), Some("e2e4".to_string()));
    }

    #[test]
    fn test_pick_out_of_book_position() {
        let book = Book::from_entries(entries_for_start(&[("e2e4", 10)]));

        let mut position = Chess::default();
        let mv = "e2e4"
            .parse::<UciMove>()
            .unwrap()
            .to_move(&position)
            .unwrap();
        position.play_unchecked(mv);

        assert_eq!(book.pick(&position), None);
    }

    #[test]
    fn test_pick_skips_illegal_and_weightless() {
        let book = Book::from_entries(entries_for_start(&[
            ("e2e5", 1000),
            ("a7a5", 1000),
            ("d2d4", 0),
            ("g1f3", 3),
        ]));

        for _ in 0..20 {
            assert_eq!(book.pick(&Chess::default()), Some("g1f3".to_string()));
        }
    }

    #[test]
    fn test_pick_with_no_usable_weight() {
        let book = Book::from_entries(entries_for_start(&[("e2e4", 0)]));
        assert_eq!(book.pick(&Chess::default()), None);
    }

    #[test]
    fn test_pick_returns_listed_candidate() {
        let book = Book::from_entries(entries_for_start(&[("e2e4", 5), ("d2d4", 5)]));
        for _ in 0..20 {
            let pick = book.pick(&Chess::default()).unwrap();
            assert!(pick == "e2e4" || pick == "d2d4");
        }
    }
}
