//! Conversation memory persisted as a bounded JSON log
//!
//! The log is a single JSON array of turns, oldest first, capped at a
//! configured number of entries. Writes go to a temporary file in the same
//! directory and are renamed over the log, so a crashed writer never leaves
//! a torn file behind. A missing or unparseable log reads as empty; callers
//! never see a parse failure.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

use crate::conversation::Turn;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("failed to write memory log: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode memory log: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable store for the conversation log.
///
/// Owns the backing file exclusively; all mutation goes through
/// [`MemoryStore::append_turn`]. There is no inter-process locking: two
/// processes appending concurrently race, and the last writer wins.
pub struct MemoryStore {
    path: PathBuf,
    max_turns: usize,
}

impl MemoryStore {
    pub fn new(path: impl Into<PathBuf>, max_turns: usize) -> Self {
        Self {
            path: path.into(),
            max_turns,
        }
    }

    /// Render the current log as newline-joined `role: content` lines,
    /// oldest first. Empty string when no log exists or it is unreadable.
    pub fn retrieve_context(&self) -> String {
        self.load()
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Append a user turn followed by an assistant turn, truncate to the
    /// most recent `max_turns` entries, and persist atomically.
    pub fn append_turn(&self, user: &str, assistant: &str) -> Result<(), MemoryError> {
        let mut log = self.load();
        log.push(Turn::user(user));
        log.push(Turn::assistant(assistant));
        if log.len() > self.max_turns {
            let excess = log.len() - self.max_turns;
            log.drain(..excess);
        }
        self.persist(&log)
    }

    /// All turns whose content contains `query` case-insensitively, in log
    /// order. Empty when the log is missing or corrupt.
    pub fn search(&self, query: &str) -> Vec<Turn> {
        let needle = query.to_lowercase();
        self.load()
            .into_iter()
            .filter(|t| t.content.to_lowercase().contains(&needle))
            .collect()
    }

    fn load(&self) -> Vec<Turn> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "memory log unreadable, treating as empty");
                }
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(turns) => turns,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "memory log corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    fn persist(&self, log: &[Turn]) -> Result<(), MemoryError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // The temp file must live on the same filesystem as the log for the
        // rename to be atomic.
        let mut tmp = NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, log)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| MemoryError::Io(e.error))?;
        Ok(())
    }
}
