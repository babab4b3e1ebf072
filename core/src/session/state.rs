//! Session data model.

use std::fmt;
use std::path::PathBuf;

use crate::process::{CommandLine, ExitInfo};
use crate::sandbox::FetchOutcome;

/// Lifecycle phase of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Asking the operator for a repo and commands.
    Prompting,
    /// Cloning into the sandbox.
    Cloning,
    /// The sandbox already existed; waiting on the remove-or-keep decision.
    CloneConflict,
    /// Running the confirmed dependency install.
    Installing,
    /// Running the operator's command, or passing through when there is none.
    Running,
    /// Session done; asking whether to start another.
    AwaitingRestart,
    /// Offering registered sandboxes for removal.
    CleaningUp,
    /// Finished. No further transitions.
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Prompting => "prompting",
            Phase::Cloning => "cloning",
            Phase::CloneConflict => "clone-conflict",
            Phase::Installing => "installing",
            Phase::Running => "running",
            Phase::AwaitingRestart => "awaiting-restart",
            Phase::CleaningUp => "cleaning-up",
            Phase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What the operator asked for in one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Repository to clone.
    pub repo_source: String,
    /// Command to run inside the sandbox.
    pub run_command: Option<CommandLine>,
    /// Command to open the sandbox with.
    pub open_command: Option<CommandLine>,
}

impl SessionRequest {
    /// Creates a request that only clones `repo_source`.
    pub fn new(repo_source: impl Into<String>) -> Self {
        Self {
            repo_source: repo_source.into(),
            run_command: None,
            open_command: None,
        }
    }

    /// Sets the run command.
    pub fn with_run(mut self, command: CommandLine) -> Self {
        self.run_command = Some(command);
        self
    }

    /// Sets the open command.
    pub fn with_open(mut self, command: CommandLine) -> Self {
        self.open_command = Some(command);
        self
    }
}

/// Mutable state of one session.
#[derive(Debug)]
pub struct SessionState {
    sandbox_path: PathBuf,
    phase: Phase,
    history: Vec<Phase>,
}

impl SessionState {
    /// Starts a session in [`Phase::Prompting`].
    pub fn new(sandbox_path: PathBuf) -> Self {
        Self {
            sandbox_path,
            phase: Phase::Prompting,
            history: vec![Phase::Prompting],
        }
    }

    /// Moves to `phase`.
    pub fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = %self.phase, to = %phase, path = ?self.sandbox_path, "session phase change");
        self.phase = phase;
        self.history.push(phase);
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Sandbox directory for this session.
    pub fn sandbox_path(&self) -> &PathBuf {
        &self.sandbox_path
    }

    /// Phases entered so far, in order.
    pub fn history(&self) -> &[Phase] {
        &self.history
    }
}

/// Record of a finished session.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    /// Sandbox directory used.
    pub sandbox_path: PathBuf,
    /// Result of the last fetch attempt, if one was made.
    pub fetch: Option<FetchOutcome>,
    /// Whether this session newly registered the sandbox for cleanup.
    pub registered: bool,
    /// Exit of the install command, if one ran.
    pub install: Option<ExitInfo>,
    /// Exit of the run command, if one ran.
    pub run: Option<ExitInfo>,
    /// Error that ended the session early.
    pub error: Option<String>,
    /// Phases the session went through.
    pub phases: Vec<Phase>,
}

impl SessionOutcome {
    pub(crate) fn new(sandbox_path: PathBuf) -> Self {
        Self {
            sandbox_path,
            fetch: None,
            registered: false,
            install: None,
            run: None,
            error: None,
            phases: Vec::new(),
        }
    }

    /// Last phase the session reached.
    pub fn final_phase(&self) -> Option<Phase> {
        self.phases.last().copied()
    }
}
