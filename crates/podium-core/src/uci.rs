//! Parsers for the engine-to-console half of the UCI text protocol.

use crate::analysis::{AnalysisUpdate, Score, Wdl};

/// Parse an `info` line into an update. Returns None for lines that are
/// not analysis, including `info string` chatter and malformed fields.
pub fn parse_info(line: &str) -> Option<AnalysisUpdate> {
    let rest = line.strip_prefix("info")?;
    let parts: Vec<&str> = rest.split_whitespace().collect();
    if parts.is_empty() {
        return None;
    }

    let mut update = AnalysisUpdate::default();
    let mut i = 0;
    while i < parts.len() {
        match parts[i] {
            "string" => return None,
            "time" => {
                update.time_ms = Some(parts.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "depth" => {
                update.depth = Some(parts.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "seldepth" => {
                update.seldepth = Some(parts.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "nodes" => {
                update.nodes = Some(parts.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "nps" => {
                update.nps = Some(parts.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "multipv" => {
                update.multipv = Some(parts.get(i + 1)?.parse().ok()?);
                i += 2;
            }
            "score" => {
                update.score = match (parts.get(i + 1), parts.get(i + 2)) {
                    (Some(&"cp"), Some(value)) => Some(Score::Cp(value.parse().ok()?)),
                    (Some(&"mate"), Some(value)) => Some(Score::Mate(value.parse().ok()?)),
                    _ => return None,
                };
                i += 3;
            }
            "wdl" => {
                update.wdl = Some(Wdl {
                    win: parts.get(i + 1)?.parse().ok()?,
                    draw: parts.get(i + 2)?.parse().ok()?,
                    loss: parts.get(i + 3)?.parse().ok()?,
                });
                i += 4;
            }
            "pv" => {
                update.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => i += 1,
        }
    }
    Some(update)
}

/// Parse a `bestmove` line into (best, ponder). A reported `(none)`
/// becomes a None best move.
pub fn parse_bestmove(line: &str) -> Option<(Option<String>, Option<String>)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.first() != Some(&"bestmove") {
        return None;
    }
    let best = match parts.get(1) {
        None => return None,
        Some(&"(none)") => None,
        Some(mv) => Some(mv.to_string()),
    };
    let ponder = match (parts.get(2), parts.get(3)) {
        (Some(&"ponder"), Some(mv)) => Some(mv.to_string()),
        _ => None,
    };
    Some((best, ponder))
}

/// Engine identity from an `id name` line.
pub fn parse_id_name(line: &str) -> Option<&str> {
    line.strip_prefix("id name ").map(str::trim)
}
