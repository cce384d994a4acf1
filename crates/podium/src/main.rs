//! Tournament operator console.
//!
//! Drives a UCI engine against a live game with a dual clock, taking
//! operator commands on stdin and persisting state across restarts.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use podium::book::Book;
use podium::config::Config;
use podium::engine::EngineSession;
use podium::intents::parse_line;
use podium::orchestrator::Orchestrator;
use podium::snapshot::SnapshotStore;
use podium_core::{Intent, OrchestrationState};

/// Read operator commands from stdin and forward them as intents.
/// Dropping the sender on `quit` or EOF shuts the console down.
fn spawn_input_reader(tx: UnboundedSender<Intent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == "quit" {
                break;
            }
            let intents = parse_line(trimmed);
            if intents.is_empty() {
                warn!(line = trimmed, "Unrecognized command");
                continue;
            }
            for intent in intents {
                if tx.send(intent).is_err() {
                    return;
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let store = SnapshotStore::new(&config.data_dir);
    let state = match store.load() {
        Some(state) => {
            info!(ply = state.game.ply_count(), "Resuming from snapshot");
            state
        }
        None => OrchestrationState::new(config.start_time_ms),
    };

    let book = match &config.book_path {
        Some(path) => match Book::load(path) {
            Ok(book) => {
                info!(positions = book.len(), "Opening book loaded");
                Some(book)
            }
            Err(e) => {
                warn!("Opening book unavailable: {e}");
                None
            }
        },
        None => None,
    };

    info!(engine = config.engine_path.as_str(), "Starting engine");
    let session = EngineSession::spawn(&config).await?;

    let (intent_tx, intent_rx) = tokio::sync::mpsc::unbounded_channel();
    spawn_input_reader(intent_tx);

    Orchestrator::new(
        state,
        session,
        store,
        book,
        config.time_control(),
        config.multipv,
        intent_rx,
    )
    .run(Duration::from_millis(config.tick_ms))
    .await?;

    Ok(())
}
