//! Build the binary opening book from a JSON move list.
//!
//! The source maps FENs to weighted candidate moves:
//!
//!   { "<fen>": [ {"uci": "e2e4", "weight": 120}, ... ] }
//!
//! Usage: cargo run --release --bin build-book -- <moves.json> <book.bin> [--min-weight N]

use std::collections::HashMap;
use std::env;
use std::fs;

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode};

use podium::book::{BookEntries, BookMove};
use podium_core::normalized_fen;

const DEFAULT_MIN_WEIGHT: u32 = 1;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <moves.json> <book.bin> [--min-weight N]", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  cargo run --release --bin build-book -- book/moves.json data/book.bin");
        std::process::exit(1);
    }

    let source_path = &args[1];
    let output_path = &args[2];

    let mut min_weight = DEFAULT_MIN_WEIGHT;
    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "--min-weight" => {
                min_weight = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MIN_WEIGHT);
                i += 2;
            }
            _ => i += 1,
        }
    }

    println!("Building opening book:");
    println!("  Source: {}", source_path);
    println!("  Output: {}", output_path);
    println!("  Min weight: {}", min_weight);
    println!();

    let raw = fs::read_to_string(source_path)?;
    let source: HashMap<String, Vec<BookMove>> = serde_json::from_str(&raw)?;
    println!("Parsed {} positions", source.len());

    let mut entries = BookEntries::new();
    let mut total_moves = 0usize;
    let mut skipped_positions = 0usize;
    let mut skipped_moves = 0usize;

    for (fen, candidates) in source {
        // Positions that do not parse can never be looked up.
        let position: Chess = match fen.parse::<Fen>() {
            Ok(parsed) => match parsed.into_position(CastlingMode::Standard) {
                Ok(position) => position,
                Err(_) => {
                    skipped_positions += 1;
                    continue;
                }
            },
            Err(_) => {
                skipped_positions += 1;
                continue;
            }
        };

        let playable: Vec<BookMove> = candidates
            .into_iter()
            .filter(|candidate| {
                let ok = candidate.weight >= min_weight
                    && candidate
                        .uci
                        .parse::<UciMove>()
                        .is_ok_and(|parsed| parsed.to_move(&position).is_ok());
                if !ok {
                    skipped_moves += 1;
                }
                ok
            })
            .collect();

        if playable.is_empty() {
            continue;
        }
        total_moves += playable.len();
        // Key by the FEN the lookup side recomputes, not the source
        // text, so formatting differences cannot hide an entry.
        let canonical = Fen::from_position(&position, EnPassantMode::Legal).to_string();
        entries
            .entry(normalized_fen(&canonical))
            .or_default()
            .extend(playable);
    }

    println!("After validation:");
    println!("  Positions: {}", entries.len());
    println!("  Moves: {}", total_moves);
    if skipped_positions > 0 || skipped_moves > 0 {
        println!(
            "  Skipped: {} positions, {} moves",
            skipped_positions, skipped_moves
        );
    }

    let bytes = bincode::serialize(&entries)?;
    fs::write(output_path, &bytes)?;
    println!();
    println!("Wrote {} ({} bytes)", output_path, bytes.len());

    Ok(())
}
