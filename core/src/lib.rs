//! git-fly - temporarily clone, run and open git repositories.
//!
//! This library provides the pieces behind the `git-fly` binary: sandbox
//! naming and cloning, process supervision with interruptible output, operator
//! prompts, and the session orchestrator that ties them together.

pub mod config;
pub mod error;
pub mod process;
pub mod prompt;
pub mod sandbox;
pub mod session;
pub mod signal;

pub use error::{Error, Result};

pub use config::{Config, InstallRule, InterruptPolicy, Validate, ValidationResult};
pub use process::{CommandLine, ExitInfo, ProcessRunner, RunningFlag};
pub use prompt::{LinePrompter, Prompter, ScriptedPrompter};
pub use sandbox::{
    sandbox_dir_name, sandbox_path, CleanupRegistry, CleanupReport, CloneRepo, FetchOutcome,
    GitClone, RepoFetcher,
};
pub use session::{Orchestrator, Phase, RunSummary, SessionOutcome, SessionRequest};
pub use signal::{InterruptAction, ShutdownSignal};
