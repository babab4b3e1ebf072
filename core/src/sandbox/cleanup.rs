//! Cleanup registry for sandboxes created during a run.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::prompt::Prompter;

/// Recursively and forcibly removes a sandbox directory.
///
/// A path that is already gone counts as removed.
pub async fn remove_sandbox(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::SandboxCleanup {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Outcome of draining the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Paths the operator approved and that were removed.
    pub removed: Vec<PathBuf>,
    /// Paths the operator chose to keep.
    pub skipped: Vec<PathBuf>,
    /// Paths whose removal failed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupReport {
    /// Returns true if no removal failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of entries this report covers.
    pub fn processed(&self) -> usize {
        self.removed.len() + self.skipped.len() + self.failures.len()
    }
}

/// Ordered, append-only set of sandbox paths to offer for removal at shutdown.
#[derive(Debug, Default)]
pub struct CleanupRegistry {
    entries: Vec<PathBuf>,
    cursor: usize,
}

impl CleanupRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a path. Returns false if it was already registered.
    pub fn register(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.entries.contains(&path) {
            tracing::debug!(path = ?path, "sandbox already registered for cleanup");
            return false;
        }
        tracing::debug!(path = ?path, "registered sandbox for cleanup");
        self.entries.push(path);
        true
    }

    /// All registered paths in insertion order.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Paths not yet processed by [`drain`](Self::drain).
    pub fn pending(&self) -> &[PathBuf] {
        &self.entries[self.cursor..]
    }

    /// Returns true once every entry has been processed.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.entries.len()
    }

    /// Walks the pending entries in order, removing each one the operator confirms.
    ///
    /// The cursor advances past every entry whatever the answer, so no entry is
    /// ever offered twice. Removal failures are collected rather than aborting.
    pub async fn drain(&mut self, prompter: &dyn Prompter) -> CleanupReport {
        let mut report = CleanupReport::default();

        if self.is_exhausted() {
            prompter.say("Nothing to clean up.").await;
            return report;
        }

        prompter.say("Starting cleanup...").await;

        while let Some(path) = self.entries.get(self.cursor).cloned() {
            let approved = match prompter.confirm(&format!("Remove {}?", path.display()), true).await {
                Ok(answer) => answer,
                Err(e) => {
                    tracing::warn!(path = ?path, error = %e, "no answer for cleanup prompt, keeping sandbox");
                    false
                }
            };

            if approved {
                match remove_sandbox(&path).await {
                    Ok(()) => {
                        prompter.say(&format!("Removed {}", path.display())).await;
                        report.removed.push(path);
                    }
                    Err(e) => {
                        tracing::warn!(path = ?path, error = %e, "failed to remove sandbox");
                        report.failures.push((path, e.to_string()));
                    }
                }
            } else {
                report.skipped.push(path);
            }

            self.cursor += 1;
        }

        for (path, reason) in &report.failures {
            prompter
                .warn(&format!("Could not remove {}: {}", path.display(), reason))
                .await;
        }
        prompter.say("Finished cleaning up!").await;

        report
    }
}
