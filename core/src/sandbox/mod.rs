//! Sandbox directories: naming, fetching and cleanup.
//!
//! A sandbox is a plain directory under the configured root that holds one
//! cloned repository. [`RepoFetcher`] fills it through a [`CloneRepo`]
//! capability and [`CleanupRegistry`] tracks it until shutdown.

mod cleanup;
mod fetch;
mod naming;

pub use cleanup::{remove_sandbox, CleanupRegistry, CleanupReport};
pub use fetch::{CloneError, CloneRepo, FetchOutcome, GitClone, RepoFetcher, ALREADY_EXISTS_MARKER};
pub use naming::{sandbox_dir_name, sandbox_path, MAX_DIR_NAME_LEN};
