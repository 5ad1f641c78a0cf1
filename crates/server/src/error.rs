//! Error types.
//!
//! Only contract violations and infrastructure failures are errors. Expected
//! user-facing rejections (permission denials, volume limits, timeouts) are
//! reported to the session as messages instead.

use std::path::PathBuf;

/// A programming-contract violation inside the core, usually a dispatcher
/// bug. The current operation is aborted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A mark arrived or execute was requested with no selection running.
    #[error("no selection is in progress")]
    NoSelectionInProgress,
    /// A selection expected marks but had no action to run on completion.
    #[error("selection has no completion action")]
    MissingSelectionCallback,
    /// Execute was requested before all marks were collected.
    #[error("selection incomplete: {have} of {want} marks")]
    SelectionIncomplete { have: usize, want: usize },
    /// A world operation ran for a session that is not in any world.
    #[error("session {0} is not in a world")]
    NoWorld(u64),
}

/// Failure to load or save a [`crate::config::CoreConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),
}
