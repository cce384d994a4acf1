//! Operator console runtime: engine session, opening book, snapshots,
//! and the orchestration loop that ties them to the core state.

pub mod book;
pub mod config;
pub mod engine;
pub mod error;
pub mod intents;
pub mod orchestrator;
pub mod snapshot;
