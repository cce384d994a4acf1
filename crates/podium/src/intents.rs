//! Line-based operator command surface.
//!
//! Each input line decodes into zero or more intents, so any front end
//! that can produce these lines can drive the console.

use podium_core::Intent;
use shakmaty::Color;

fn parse_side(word: &str) -> Option<Color> {
    match word {
        "w" | "white" => Some(Color::White),
        "b" | "black" => Some(Color::Black),
        _ => None,
    }
}

/// Decode one input line. Unrecognized lines decode to nothing.
pub fn parse_line(line: &str) -> Vec<Intent> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(&word) = parts.first() else {
        return vec![];
    };
    match word {
        "engine" => vec![Intent::ToggleEngine],
        "timer" => vec![Intent::ToggleTimer],
        "flip" => vec![Intent::Flip],
        "theme" => vec![Intent::CycleTheme],
        "ack" => vec![Intent::AckMoveReady],
        "del" => vec![Intent::PopPending],
        "clear" => vec![Intent::ClearPending],
        "commit" => vec![Intent::Commit],
        "undo" => vec![Intent::Undo],
        "force" => vec![Intent::ForceMove],
        "timed" => match parts.get(1).and_then(|s| parse_side(s)) {
            Some(side) => vec![Intent::ToggleTimed(side)],
            None => vec![],
        },
        "clock" => {
            let side = parts.get(1).and_then(|s| parse_side(s));
            let secs = parts.get(2).and_then(|s| s.parse::<f64>().ok());
            match (side, secs) {
                (Some(side), Some(secs)) => vec![Intent::AdjustClock {
                    side,
                    delta_ms: secs * 1000.0,
                }],
                _ => vec![],
            }
        }
        "move" => match parts.get(1) {
            Some(entry) => {
                let mut intents = vec![Intent::ClearPending];
                intents.extend(entry.chars().map(Intent::PushPending));
                intents
            }
            None => vec![],
        },
        "promo" => match parts.get(1).and_then(|s| s.chars().next()) {
            Some(piece) => vec![Intent::SetPromotion(piece)],
            None => vec![],
        },
        _ => vec![],
    }
}
