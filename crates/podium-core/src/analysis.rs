//! Rolling window of engine analysis snapshots, bucketed by report time.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshots retained before the oldest falls off.
const WINDOW_CAP: usize = 16;

/// Engine evaluation, from the point of view of the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Score {
    Cp(i32),
    Mate(i32),
}

/// Win/draw/loss expectation in permille.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wdl {
    pub win: u32,
    pub draw: u32,
    pub loss: u32,
}

impl fmt::Display for Wdl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.win, self.draw, self.loss)
    }
}

/// One parsed `info` line. Absent fields were not reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisUpdate {
    pub time_ms: Option<u64>,
    pub depth: Option<u32>,
    pub seldepth: Option<u32>,
    pub nodes: Option<u64>,
    pub nps: Option<u64>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    pub wdl: Option<Wdl>,
    pub pv: Vec<String>,
}

/// Latest figures for one candidate move within a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveInfo {
    pub score: Option<Score>,
    pub wdl: Option<Wdl>,
    pub nodes: Option<u64>,
}

/// All updates that reported the same search time, merged.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSnapshot {
    pub time_ms: u64,
    pub depth: u32,
    pub seldepth: u32,
    pub nps: u64,
    pub moves: BTreeMap<String, MoveInfo>,
    pub pv: Vec<String>,
}

impl AnalysisSnapshot {
    fn merge(&mut self, update: &AnalysisUpdate) {
        if let Some(depth) = update.depth {
            self.depth = depth;
        }
        if let Some(seldepth) = update.seldepth {
            self.seldepth = seldepth;
        }
        if let Some(nps) = update.nps {
            self.nps = nps;
        }
        if let Some(first) = update.pv.first() {
            let info = self.moves.entry(first.clone()).or_default();
            if update.score.is_some() {
                info.score = update.score;
            }
            if update.wdl.is_some() {
                info.wdl = update.wdl;
            }
            if update.nodes.is_some() {
                info.nodes = update.nodes;
            }
        }
        // Only the primary line replaces the displayed variation.
        if update.multipv.unwrap_or(1) == 1 && !update.pv.is_empty() {
            self.pv = update.pv.clone();
        }
    }
}

/// Snapshots ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct AnalysisWindow {
    snapshots: VecDeque<AnalysisSnapshot>,
}

impl AnalysisWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an update into the window.
    ///
    /// A report time strictly greater than the current snapshot opens a
    /// new one; anything else merges into the current snapshot, so
    /// multipv lines emitted together land in the same bucket.
    pub fn apply(&mut self, update: &AnalysisUpdate) {
        let time_ms = update.time_ms.unwrap_or(0);
        let advance = match self.snapshots.front() {
            Some(current) => time_ms > current.time_ms,
            None => true,
        };
        if advance {
            self.snapshots.push_front(AnalysisSnapshot {
                time_ms,
                ..AnalysisSnapshot::default()
            });
            self.snapshots.truncate(WINDOW_CAP);
        }
        if let Some(current) = self.snapshots.front_mut() {
            current.merge(update);
        }
    }

    pub fn current(&self) -> Option<&AnalysisSnapshot> {
        self.snapshots.front()
    }

    pub fn previous(&self) -> Option<&AnalysisSnapshot> {
        self.snapshots.get(1)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Wdl for a specific move, falling back one snapshot when the
    /// current bucket has not reported it yet.
    pub fn wdl_for_move(&self, uci: &str) -> Option<Wdl> {
        self.snapshots
            .iter()
            .take(2)
            .find_map(|snapshot| snapshot.moves.get(uci).and_then(|info| info.wdl))
    }

    /// Wdl of the head of the current principal variation.
    pub fn best_wdl(&self) -> Option<Wdl> {
        let current = self.current()?;
        let first = current.pv.first()?;
        current.moves.get(first).and_then(|info| info.wdl)
    }
}
