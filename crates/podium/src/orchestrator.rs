//! The orchestration loop.
//!
//! One task owns the whole console state and advances it on a fixed
//! cadence: charge the clock, act on operator requests, keep exactly
//! the search the state calls for outstanding, and fold engine output
//! back into the game.

use std::time::Duration;

use chrono::{DateTime, Utc};
use shakmaty::Color;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use podium_core::{
    side_index, GameError, Intent, MoveAnnotation, OrchestrationState, TimeControl, STATUS_IDLE,
    STATUS_STOPPED,
};

use crate::book::Book;
use crate::engine::{EngineSession, SearchLimit};
use crate::error::ConsoleError;
use crate::snapshot::SnapshotStore;

pub struct Orchestrator {
    state: OrchestrationState,
    session: EngineSession,
    store: SnapshotStore,
    book: Option<Book>,
    control: TimeControl,
    multipv: u32,
    intents: UnboundedReceiver<Intent>,
}

impl Orchestrator {
    pub fn new(
        state: OrchestrationState,
        session: EngineSession,
        store: SnapshotStore,
        book: Option<Book>,
        control: TimeControl,
        multipv: u32,
        intents: UnboundedReceiver<Intent>,
    ) -> Self {
        Self {
            state,
            session,
            store,
            book,
            control,
            multipv,
            intents,
        }
    }

    pub fn state(&self) -> &OrchestrationState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn state_mut(&mut self) -> &mut OrchestrationState {
        &mut self.state
    }

    /// Drive the console until the operator input closes.
    pub async fn run(mut self, cadence: Duration) -> Result<(), ConsoleError> {
        let mut ticker = tokio::time::interval(cadence);
        loop {
            ticker.tick().await;
            if self.drain_intents(Utc::now()) {
                break;
            }
            self.tick(Utc::now()).await?;
        }
        info!("Operator input closed, shutting down");
        self.persist();
        self.session.quit().await;
        Ok(())
    }

    /// Apply queued operator intents. Returns true once the input side
    /// has hung up and the console should exit.
    pub(crate) fn drain_intents(&mut self, now: DateTime<Utc>) -> bool {
        let mut changed = false;
        loop {
            match self.intents.try_recv() {
                Ok(intent) => {
                    debug!(?intent, "Operator intent");
                    if self.state.apply_intent(intent, now) {
                        changed = true;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return true,
            }
        }
        if changed {
            self.persist();
        }
        false
    }

    /// Advance the console by one step.
    ///
    /// Order matters: operator requests are honored before the search
    /// lifecycle is reconciled, and engine output is folded in last so
    /// a conclusion always sees the position it was searched for.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<(), ConsoleError> {
        let side = self.state.game.side_to_move();
        self.state.clock.tick(side, now);

        if self.state.undo_requested {
            self.state.undo_requested = false;
            self.persist();
            if self.undo_ply() {
                self.restart_search().await?;
            }
        }

        if self.state.commit_requested {
            self.state.commit_requested = false;
            self.persist();
            self.commit_pending().await?;
        }

        if self.state.force_move {
            self.state.force_move = false;
            self.persist();
            self.session.request_stop()?;
        }

        if self.state.engine_enabled && !self.session.has_search() {
            self.restart_search().await?;
        }

        if !self.state.engine_enabled && self.session.has_search() {
            self.session.abort().await?;
            self.state.engine_status = STATUS_STOPPED.to_string();
            self.persist();
        }

        self.session.poll_updates()?;

        if self.session.is_concluded() {
            self.conclude().await?;
        }

        Ok(())
    }

    /// Retract the last move. Returns false when there is none.
    fn undo_ply(&mut self) -> bool {
        let Some(popped) = self.state.game.undo() else {
            return false;
        };
        // The retracting side is to move again; the increment it was
        // granted comes back off.
        let mover = self.state.game.side_to_move();
        let increment = self.control.increment_for(mover, self.state.timed_search);
        self.state.clock.adjust(mover, -increment);
        self.state.clock.reset_move_timer(mover);
        self.state.annotations.pop();
        self.state.statusbar = self.state.game.claims_summary();
        info!(mv = popped.as_str(), "Move retracted");
        true
    }

    /// Commit the operator's pending entry as a move.
    async fn commit_pending(&mut self) -> Result<(), ConsoleError> {
        let mut entry = self.state.game.pending().to_string();
        if entry.is_empty() {
            self.state.statusbar = "No move entered".to_string();
            return Ok(());
        }
        if entry.len() == 4 && self.state.game.needs_promotion_suffix(&entry) {
            entry.push(self.state.promotion.to_ascii_lowercase());
        }

        let annotation = self
            .session
            .current_window()
            .map(|window| MoveAnnotation::from_window(window, &entry))
            .unwrap_or_else(|| MoveAnnotation::Note("(unknown)".to_string()));

        match self.commit_move(&entry, annotation) {
            Ok(()) => self.restart_search().await?,
            Err(e) => {
                warn!(entry = entry.as_str(), "Rejected move entry: {e}");
                self.state.statusbar = format!("Illegal move: {entry}");
            }
        }
        Ok(())
    }

    /// Play a validated move: position, clock, annotation, snapshot.
    fn commit_move(&mut self, uci: &str, annotation: MoveAnnotation) -> Result<(), GameError> {
        let mover = self.state.game.side_to_move();
        self.state.game.apply_uci(uci)?;
        let increment = self.control.increment_for(mover, self.state.timed_search);
        self.state.clock.apply_increment(mover, increment);
        self.state.clock.reset_move_timer(!mover);
        self.state.annotations.push(annotation);
        self.state.statusbar = self.state.game.claims_summary();
        info!(mv = uci, ply = self.state.game.ply_count(), "Move committed");
        self.persist();
        Ok(())
    }

    /// Fold a finished search back into the game.
    async fn conclude(&mut self) -> Result<(), ConsoleError> {
        let Some(finished) = self.session.take_concluded() else {
            return Ok(());
        };
        if finished.position_fen != self.state.game.fen() {
            warn!("Discarding stale search result");
            self.restart_search().await?;
            return Ok(());
        }
        match finished.best {
            Some(best) => {
                let annotation = MoveAnnotation::from_window(&finished.window, &best);
                match self.commit_move(&best, annotation) {
                    Ok(()) => {
                        self.state.move_ready = true;
                        self.persist();
                        self.restart_search().await?;
                    }
                    Err(e) => {
                        return Err(ConsoleError::Engine(format!(
                            "Engine chose an unplayable move {best}: {e}"
                        )))
                    }
                }
            }
            None => {
                info!("Search concluded without a move");
                self.restart_search().await?;
            }
        }
        Ok(())
    }

    /// Settle the engine and issue whatever search the state calls for.
    ///
    /// Timed sides consult the book first; a book hit commits the move
    /// outright and the procedure repeats for the opponent.
    async fn restart_search(&mut self) -> Result<(), ConsoleError> {
        loop {
            self.session.abort().await?;
            self.state.force_move = false;

            if !self.state.engine_enabled {
                return Ok(());
            }

            if self.state.game.is_terminal() {
                self.state.clock.disarm();
                self.state.engine_enabled = false;
                self.state.engine_status = STATUS_IDLE.to_string();
                if let Some(label) = self.state.game.outcome_label() {
                    info!(outcome = label.as_str(), "Game over");
                    self.state.statusbar = label;
                }
                self.persist();
                return Ok(());
            }

            self.persist();

            let side = self.state.game.side_to_move();
            if self.state.timed_search[side_index(side)] {
                let book_pick = self
                    .book
                    .as_ref()
                    .and_then(|book| book.pick(self.state.game.position()));
                if let Some(uci) = book_pick {
                    match self.commit_move(&uci, MoveAnnotation::Note("book".to_string())) {
                        Ok(()) => {
                            info!(mv = uci.as_str(), "Book move played");
                            self.state.move_ready = true;
                            self.persist();
                            continue;
                        }
                        Err(e) => {
                            warn!(mv = uci.as_str(), "Skipping unplayable book move: {e}");
                        }
                    }
                }

                let wtime = self.state.clock.remaining_ms(Color::White);
                let btime = self.state.clock.remaining_ms(Color::Black);
                let winc = self
                    .control
                    .increment_for(Color::White, self.state.timed_search);
                let binc = self
                    .control
                    .increment_for(Color::Black, self.state.timed_search);
                self.state.engine_status = format!(
                    "go wtime {} btime {}",
                    wtime.round() as i64,
                    btime.round() as i64
                );
                let fen = self.state.game.fen();
                self.session
                    .start_search(
                        self.state.game.uci_moves(),
                        fen,
                        SearchLimit::Clock {
                            wtime_ms: wtime,
                            btime_ms: btime,
                            winc_ms: winc,
                            binc_ms: binc,
                        },
                        self.multipv,
                    )
                    .await?;
            } else {
                self.state.engine_status = "go infinite".to_string();
                let fen = self.state.game.fen();
                self.session
                    .start_search(
                        self.state.game.uci_moves(),
                        fen,
                        SearchLimit::Infinite,
                        self.multipv,
                    )
                    .await?;
            }
            return Ok(());
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            error!("Failed to save snapshot: {e}");
        }
    }
}
