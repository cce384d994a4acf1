//! Console state persistence.
//!
//! The state is written to a binary file after every change that
//! matters, so a crash or restart resumes the game where it stopped.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use podium_core::OrchestrationState;

use crate::error::ConsoleError;

/// Bumped when the snapshot layout changes; older files are ignored.
pub const SNAPSHOT_VERSION: u32 = 1;

/// File name inside the data directory.
pub const SNAPSHOT_FILE: &str = "state.bin";

#[derive(Serialize)]
struct SnapshotFileRef<'a> {
    version: u32,
    state: &'a OrchestrationState,
}

#[derive(Deserialize)]
struct SnapshotFile {
    version: u32,
    state: OrchestrationState,
}

/// Reads and writes the console state under a data directory.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            path: data_dir.as_ref().join(SNAPSHOT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last saved state. Unreadable, undecodable, or outdated
    /// snapshots count as absent so the console can always start.
    pub fn load(&self) -> Option<OrchestrationState> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read snapshot: {e}");
                return None;
            }
        };
        let snapshot: SnapshotFile = match bincode::deserialize(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(path = %self.path.display(), "Ignoring undecodable snapshot: {e}");
                return None;
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                version = snapshot.version,
                "Ignoring snapshot with unsupported version"
            );
            return None;
        }
        Some(snapshot.state)
    }

    /// Write the state through a temporary file so a crash mid-write
    /// never clobbers the previous snapshot.
    pub fn save(&self, state: &OrchestrationState) -> Result<(), ConsoleError> {
        let bytes = bincode::serialize(&SnapshotFileRef {
            version: SNAPSHOT_VERSION,
            state,
        })?;
        let tmp = self.path.with_extension("bin.tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
