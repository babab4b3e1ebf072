//! Repository fetching into sandbox directories.

use std::fmt;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Marker in clone failure output that signals a destination conflict.
pub const ALREADY_EXISTS_MARKER: &str = "already exists";

/// Failure reported by a clone capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneError {
    /// Diagnostic text from the clone (usually the tool's stderr).
    pub stderr: String,
}

impl CloneError {
    /// Creates a clone error from diagnostic text.
    pub fn new(stderr: impl Into<String>) -> Self {
        Self {
            stderr: stderr.into(),
        }
    }
}

impl fmt::Display for CloneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stderr.trim_end())
    }
}

/// Capability that clones a repository into a destination directory.
#[async_trait]
pub trait CloneRepo: Send + Sync {
    /// Clones `source` into `destination`.
    async fn clone_repo(&self, source: &str, destination: &Path) -> Result<(), CloneError>;
}

/// Clone capability backed by the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitClone {
    git_program: String,
}

impl Default for GitClone {
    fn default() -> Self {
        Self::new()
    }
}

impl GitClone {
    /// Creates a clone capability using the `git` found on `PATH`.
    pub fn new() -> Self {
        Self {
            git_program: "git".to_string(),
        }
    }

    /// Creates a clone capability using a custom git binary.
    pub fn with_program(git_program: impl Into<String>) -> Self {
        Self {
            git_program: git_program.into(),
        }
    }
}

#[async_trait]
impl CloneRepo for GitClone {
    async fn clone_repo(&self, source: &str, destination: &Path) -> Result<(), CloneError> {
        tracing::debug!(git = %self.git_program, source = %source, destination = ?destination, "running git clone");

        let output = Command::new(&self.git_program)
            .arg("clone")
            .arg("--")
            .arg(source)
            .arg(destination)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CloneError::new(format!("failed to run {}: {}", self.git_program, e)))?;

        if !output.status.success() {
            return Err(CloneError::new(String::from_utf8_lossy(&output.stderr)));
        }

        Ok(())
    }
}

/// Classified result of a fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination now holds the cloned tree.
    Success,
    /// The destination was already present.
    AlreadyExists,
    /// Any other clone failure, with its detail text.
    Failure(String),
}

/// Invokes a clone capability once and classifies the result.
pub struct RepoFetcher<C: CloneRepo> {
    clone: C,
}

impl<C: CloneRepo> RepoFetcher<C> {
    /// Creates a fetcher around a clone capability.
    pub fn new(clone: C) -> Self {
        Self { clone }
    }

    /// Returns the underlying clone capability.
    pub fn capability(&self) -> &C {
        &self.clone
    }

    /// Fetches `source` into `destination`.
    ///
    /// Never retries and never rolls back a partial destination.
    pub async fn fetch(&self, source: &str, destination: &Path) -> FetchOutcome {
        match self.clone.clone_repo(source, destination).await {
            Ok(()) => {
                tracing::info!(source = %source, destination = ?destination, "cloned repository");
                FetchOutcome::Success
            }
            Err(e) if e.stderr.contains(ALREADY_EXISTS_MARKER) => {
                tracing::info!(destination = ?destination, "clone destination already exists");
                FetchOutcome::AlreadyExists
            }
            Err(e) => {
                tracing::warn!(source = %source, error = %e, "clone failed");
                FetchOutcome::Failure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClone {
        result: Result<(), CloneError>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CloneRepo for StubClone {
        async fn clone_repo(&self, _source: &str, _destination: &Path) -> Result<(), CloneError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn fetcher(result: Result<(), CloneError>) -> RepoFetcher<StubClone> {
        RepoFetcher::new(StubClone {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn fetch_reports_success() {
        let fetcher = fetcher(Ok(()));
        let outcome = fetcher.fetch("src", Path::new("/tmp/dest")).await;
        assert_eq!(outcome, FetchOutcome::Success);
    }

    #[tokio::test]
    async fn fetch_classifies_already_exists() {
        let fetcher = fetcher(Err(CloneError::new(
            "fatal: destination path '/tmp/dest' already exists and is not an empty directory.\n",
        )));
        let outcome = fetcher.fetch("src", Path::new("/tmp/dest")).await;
        assert_eq!(outcome, FetchOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn fetch_classifies_other_failures_with_detail() {
        let fetcher = fetcher(Err(CloneError::new("fatal: repository 'x' not found\n")));
        let outcome = fetcher.fetch("x", Path::new("/tmp/dest")).await;
        assert_eq!(
            outcome,
            FetchOutcome::Failure("fatal: repository 'x' not found".to_string())
        );
    }

    #[tokio::test]
    async fn fetch_invokes_clone_exactly_once() {
        let fetcher = fetcher(Err(CloneError::new("network down")));
        fetcher.fetch("x", Path::new("/tmp/dest")).await;
        assert_eq!(fetcher.capability().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn git_clone_reports_missing_binary_as_error() {
        let clone = GitClone::with_program("definitely-not-a-git-binary");
        let dest = tempfile::TempDir::new().unwrap();
        let err = clone
            .clone_repo("nowhere", &dest.path().join("x"))
            .await
            .unwrap_err();
        assert!(err.stderr.contains("definitely-not-a-git-binary"));
    }

    #[tokio::test]
    async fn git_clone_treats_dashed_source_as_repository() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let source = format!("--upload-pack=touch {}", marker.display());

        let err = GitClone::new()
            .clone_repo(&source, &dir.path().join("x"))
            .await
            .unwrap_err();

        assert!(!err.stderr.trim().is_empty());
        assert!(!marker.exists());
        assert!(!dir.path().join("x").exists());
    }
}
