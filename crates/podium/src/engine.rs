//! UCI engine session with event-driven reader and writer tasks (async I/O)

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use podium_core::uci::{parse_bestmove, parse_id_name, parse_info};
use podium_core::{AnalysisUpdate, AnalysisWindow};

use crate::config::Config;
use crate::error::ConsoleError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const STOP_ACK_TIMEOUT: Duration = Duration::from_secs(5);
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

/// One engine line, classified for the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Id(String),
    UciOk,
    ReadyOk,
    Info(AnalysisUpdate),
    BestMove {
        best: Option<String>,
        ponder: Option<String>,
    },
    Terminated,
}

/// Limits for one `go` command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchLimit {
    Clock {
        wtime_ms: f64,
        btime_ms: f64,
        winc_ms: f64,
        binc_ms: f64,
    },
    Infinite,
}

fn go_command(limit: SearchLimit) -> String {
    match limit {
        SearchLimit::Clock {
            wtime_ms,
            btime_ms,
            winc_ms,
            binc_ms,
        } => format!(
            "go wtime {} btime {} winc {} binc {}",
            wtime_ms.round() as i64,
            btime_ms.round() as i64,
            winc_ms.round() as i64,
            binc_ms.round() as i64,
        ),
        SearchLimit::Infinite => "go infinite".to_string(),
    }
}

/// The search currently outstanding on the engine.
#[derive(Debug)]
struct Search {
    position_fen: String,
    window: AnalysisWindow,
    /// Some once the bestmove arrived; the inner None is `(none)`.
    concluded: Option<Option<String>>,
}

/// A search settled by its bestmove, ready for the orchestrator.
#[derive(Debug)]
pub struct FinishedSearch {
    pub best: Option<String>,
    pub position_fen: String,
    pub window: AnalysisWindow,
}

/// Handle to a running UCI engine process.
///
/// The process is driven through two channels so a long `go infinite`
/// never blocks the orchestration loop: a writer task owns stdin, a
/// reader task owns stdout and classifies each line into an event.
pub struct EngineSession {
    commands: UnboundedSender<String>,
    events: UnboundedReceiver<EngineEvent>,
    search: Option<Search>,
    name: Option<String>,
    child: Option<Child>,
}

impl EngineSession {
    /// Spawn the engine process and complete the UCI handshake.
    pub async fn spawn(config: &Config) -> Result<Self, ConsoleError> {
        let mut command = Command::new(&config.engine_path);
        command
            .args(&config.engine_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = &config.engine_dir {
            command.current_dir(dir);
        }
        let mut child = command.spawn().map_err(|e| {
            ConsoleError::Engine(format!("Failed to launch {}: {e}", config.engine_path))
        })?;

        let stdin = child.stdin.take().unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_engine(stdin, command_rx));
        tokio::spawn(read_engine(stdout, event_tx));

        let mut session = Self {
            commands: command_tx,
            events: event_rx,
            search: None,
            name: None,
            child: Some(child),
        };

        session.send("uci")?;
        session.wait_for(EngineEvent::UciOk).await?;
        if let Some(name) = &session.name {
            info!(engine = name.as_str(), "Engine ready");
        }
        session.send("isready")?;
        session.wait_for(EngineEvent::ReadyOk).await?;
        session.send("ucinewgame")?;

        Ok(session)
    }

    /// Queue a command for the engine's stdin.
    pub fn send(&self, cmd: &str) -> Result<(), ConsoleError> {
        self.commands
            .send(cmd.to_string())
            .map_err(|_| ConsoleError::Engine("Engine command channel closed".to_string()))
    }

    /// Wait for one handshake event, capturing identity lines on the way.
    async fn wait_for(&mut self, expected: EngineEvent) -> Result<(), ConsoleError> {
        loop {
            match timeout(HANDSHAKE_TIMEOUT, self.events.recv()).await {
                Err(_) => {
                    return Err(ConsoleError::Engine(
                        "Engine handshake timed out".to_string(),
                    ))
                }
                Ok(None | Some(EngineEvent::Terminated)) => {
                    return Err(ConsoleError::Engine(
                        "Engine exited during handshake".to_string(),
                    ))
                }
                Ok(Some(EngineEvent::Id(name))) => self.name = Some(name),
                Ok(Some(event)) if event == expected => return Ok(()),
                Ok(Some(_)) => {}
            }
        }
    }

    /// Issue a new search for the given position.
    ///
    /// Any previous search is settled first; the UCI stream is strictly
    /// ordered, so a new `go` before the old bestmove would make the
    /// two searches indistinguishable.
    pub async fn start_search(
        &mut self,
        moves: &[String],
        position_fen: String,
        limit: SearchLimit,
        multipv: u32,
    ) -> Result<(), ConsoleError> {
        self.abort().await?;

        self.send(&format!("setoption name MultiPV value {multipv}"))?;
        if moves.is_empty() {
            self.send("position startpos")?;
        } else {
            self.send(&format!("position startpos moves {}", moves.join(" ")))?;
        }
        self.send(&go_command(limit))?;

        self.search = Some(Search {
            position_fen,
            window: AnalysisWindow::new(),
            concluded: None,
        });
        Ok(())
    }

    /// Ask the engine to conclude the current search with its bestmove.
    /// The search stays outstanding until the bestmove arrives.
    pub fn request_stop(&mut self) -> Result<(), ConsoleError> {
        match &self.search {
            Some(search) if search.concluded.is_none() => self.send("stop"),
            _ => Ok(()),
        }
    }

    /// Discard the current search, stopping the engine if it is still
    /// running. Returns once the engine owes us nothing.
    pub async fn abort(&mut self) -> Result<(), ConsoleError> {
        let Some(search) = self.search.take() else {
            return Ok(());
        };
        if search.concluded.is_some() {
            return Ok(());
        }

        // The bestmove may already be buffered; then no stop is needed.
        loop {
            match self.events.try_recv() {
                Ok(EngineEvent::BestMove { .. }) => return Ok(()),
                Ok(EngineEvent::Terminated) | Err(TryRecvError::Disconnected) => {
                    return Err(ConsoleError::Engine("Engine process exited".to_string()))
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => break,
            }
        }

        self.send("stop")?;
        loop {
            match timeout(STOP_ACK_TIMEOUT, self.events.recv()).await {
                Err(_) => {
                    return Err(ConsoleError::Engine(
                        "Engine did not acknowledge stop".to_string(),
                    ))
                }
                Ok(None | Some(EngineEvent::Terminated)) => {
                    return Err(ConsoleError::Engine("Engine process exited".to_string()))
                }
                Ok(Some(EngineEvent::BestMove { .. })) => return Ok(()),
                Ok(Some(_)) => {}
            }
        }
    }

    /// Route buffered engine events into the current search.
    pub fn poll_updates(&mut self) -> Result<(), ConsoleError> {
        loop {
            match self.events.try_recv() {
                Ok(EngineEvent::Info(update)) => match self.search.as_mut() {
                    Some(search) => search.window.apply(&update),
                    None => debug!("Dropping analysis line with no search outstanding"),
                },
                Ok(EngineEvent::BestMove { best, .. }) => match self.search.as_mut() {
                    Some(search) if search.concluded.is_none() => {
                        debug!(best = best.as_deref().unwrap_or("(none)"), "Search concluded");
                        search.concluded = Some(best);
                    }
                    _ => debug!("Dropping bestmove with no search outstanding"),
                },
                Ok(EngineEvent::Terminated) => {
                    return Err(ConsoleError::Engine("Engine process exited".to_string()))
                }
                Ok(event) => debug!(?event, "Unexpected engine event"),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    return Err(ConsoleError::Engine("Engine process exited".to_string()))
                }
            }
        }
    }

    pub fn has_search(&self) -> bool {
        self.search.is_some()
    }

    pub fn is_concluded(&self) -> bool {
        self.search.as_ref().is_some_and(|s| s.concluded.is_some())
    }

    pub fn current_window(&self) -> Option<&AnalysisWindow> {
        self.search.as_ref().map(|s| &s.window)
    }

    /// Take the finished search out of the session, if it concluded.
    pub fn take_concluded(&mut self) -> Option<FinishedSearch> {
        if !self.is_concluded() {
            return None;
        }
        let search = self.search.take()?;
        Some(FinishedSearch {
            best: search.concluded.flatten(),
            position_fen: search.position_fen,
            window: search.window,
        })
    }

    /// Send quit and reap the process.
    pub async fn quit(mut self) {
        let _ = self.commands.send("quit".to_string());
        if let Some(mut child) = self.child.take() {
            if timeout(QUIT_TIMEOUT, child.wait()).await.is_err() {
                warn!("Engine ignored quit, killing");
                let _ = child.start_kill();
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn from_channels(
        commands: UnboundedSender<String>,
        events: UnboundedReceiver<EngineEvent>,
    ) -> Self {
        Self {
            commands,
            events,
            search: None,
            name: None,
            child: None,
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        if let Some(child) = self.child.as_mut() {
            let _ = child.start_kill();
        }
    }
}

async fn write_engine(mut stdin: ChildStdin, mut commands: UnboundedReceiver<String>) {
    while let Some(command) = commands.recv().await {
        debug!(cmd = command.as_str(), "UCI <");
        if stdin
            .write_all(format!("{command}\n").as_bytes())
            .await
            .is_err()
        {
            break;
        }
        if stdin.flush().await.is_err() {
            break;
        }
    }
}

async fn read_engine(stdout: BufReader<ChildStdout>, events: UnboundedSender<EngineEvent>) {
    let mut lines = stdout.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(line = trimmed, "UCI >");
                if let Some(event) = classify(trimmed) {
                    if events.send(event).is_err() {
                        return;
                    }
                }
            }
            Ok(None) | Err(_) => {
                let _ = events.send(EngineEvent::Terminated);
                return;
            }
        }
    }
}

/// Classify one engine output line. Unrecognized lines yield None.
fn classify(line: &str) -> Option<EngineEvent> {
    if line == "uciok" {
        return Some(EngineEvent::UciOk);
    }
    if line == "readyok" {
        return Some(EngineEvent::ReadyOk);
    }
    if let Some(name) = parse_id_name(line) {
        return Some(EngineEvent::Id(name.to_string()));
    }
    if let Some((best, ponder)) = parse_bestmove(line) {
        return Some(EngineEvent::BestMove { best, ponder });
    }
    parse_info(line).map(EngineEvent::Info)
}
