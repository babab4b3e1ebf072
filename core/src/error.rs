//! Error types for git-fly.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for session operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A child process could not be started at all.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// A command line could not be tokenized.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// The operator's input stream closed while a prompt was pending.
    #[error("prompt input closed")]
    PromptClosed,

    /// Failed to remove a sandbox directory.
    #[error("failed to remove sandbox at {path}: {reason}")]
    SandboxCleanup { path: PathBuf, reason: String },

    /// IO error during sandbox or prompt operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for git-fly operations.
pub type Result<T> = std::result::Result<T, Error>;
