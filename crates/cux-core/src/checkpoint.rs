//! Checkpoint side-file so an interrupted export can resume.
//!
//! One JSON file per output target, named `<output>.checkpoint`. Saves
//! are full-file overwrites; a crash mid-write can corrupt the file, so
//! `load` reports corruption distinctly from absence and the caller can
//! warn and restart from scratch instead of failing hard.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Pagination position persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Continuation token for the next page to fetch.
    pub pagination_token: String,
    /// Records exported so far; non-decreasing across saves within a run.
    pub total_exported: u64,
    /// Human-readable save time (RFC 3339).
    pub timestamp: String,
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("no checkpoint found at {path}")]
    NotFound { path: PathBuf },
    #[error("checkpoint at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("checkpoint I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Checkpoint {
    pub fn new(pagination_token: impl Into<String>, total_exported: u64) -> Self {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("unknown"));
        Self {
            pagination_token: pagination_token.into(),
            total_exported,
            timestamp,
        }
    }

    /// Overwrite the checkpoint for the given output target.
    pub fn save(&self, output: &Path) -> Result<(), CheckpointError> {
        let path = checkpoint_path(output);
        let json = serde_json::to_string_pretty(self).expect("checkpoint serializes");
        std::fs::write(&path, json).map_err(|source| CheckpointError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(
            records = self.total_exported,
            token_prefix = token_prefix(&self.pagination_token),
            "checkpoint saved to {}",
            path.display()
        );
        Ok(())
    }

    /// Load the checkpoint for the given output target.
    pub fn load(output: &Path) -> Result<Self, CheckpointError> {
        let path = checkpoint_path(output);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CheckpointError::NotFound { path })
            }
            Err(source) => return Err(CheckpointError::Io { path, source }),
        };
        serde_json::from_slice(&bytes).map_err(|source| CheckpointError::Corrupt { path, source })
    }

    /// Remove the checkpoint file if present. Absence is not an error.
    pub fn remove(output: &Path) -> Result<(), CheckpointError> {
        let path = checkpoint_path(output);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CheckpointError::Io { path, source }),
        }
    }
}

/// `<output-path>.checkpoint`, derived deterministically from the output
/// destination so concurrent exports to different files never collide.
pub fn checkpoint_path(output: &Path) -> PathBuf {
    let mut name: OsString = output.as_os_str().to_owned();
    name.push(".checkpoint");
    PathBuf::from(name)
}

fn token_prefix(token: &str) -> &str {
    let end = token
        .char_indices()
        .nth(10)
        .map(|(i, _)| i)
        .unwrap_or(token.len());
    &token[..end]
}
