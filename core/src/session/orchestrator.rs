//! Session orchestrator: fetch, conflict handling, install, run, cleanup.

use std::path::{Path, PathBuf};

use crate::config::{Config, InterruptPolicy};
use crate::error::Result;
use crate::process::{CommandLine, ExitInfo, ProcessRunner, RunningFlag};
use crate::prompt::{required_input, Prompter};
use crate::sandbox::{
    remove_sandbox, sandbox_path, CleanupRegistry, CleanupReport, CloneRepo, FetchOutcome,
    RepoFetcher,
};
use crate::signal::ShutdownSignal;

use super::state::{Phase, SessionOutcome, SessionRequest, SessionState};

const FAREWELL: &str = "So long and thanks for all the fish.";

/// Result of a complete orchestrator run.
#[derive(Debug)]
pub struct RunSummary {
    /// Outcomes of every finished session, in order.
    pub sessions: Vec<SessionOutcome>,
    /// Cleanup results, or `None` if cleanup was skipped or abandoned.
    pub cleanup: Option<CleanupReport>,
    /// Whether an interrupt ended the run.
    pub interrupted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    Declined,
    InputClosed,
    Interrupted,
}

/// Drives sessions until the operator is done, then cleans up.
///
/// Owns the cleanup registry for the whole run, so sandboxes from every
/// session are reconciled together at the end.
pub struct Orchestrator<C: CloneRepo, P: Prompter> {
    config: Config,
    fetcher: RepoFetcher<C>,
    runner: ProcessRunner,
    prompter: P,
    registry: CleanupRegistry,
    running: RunningFlag,
    phase: Phase,
    default_source: Option<String>,
}

impl<C: CloneRepo, P: Prompter> Orchestrator<C, P> {
    /// Creates an orchestrator from its collaborators.
    pub fn new(config: Config, clone: C, runner: ProcessRunner, prompter: P) -> Self {
        Self {
            config,
            fetcher: RepoFetcher::new(clone),
            runner,
            prompter,
            registry: CleanupRegistry::new(),
            running: RunningFlag::new(),
            phase: Phase::Prompting,
            default_source: None,
        }
    }

    /// Sets the repo source offered as the default answer.
    pub fn with_default_source(mut self, source: Option<String>) -> Self {
        self.default_source = source.filter(|s| !s.trim().is_empty());
        self
    }

    /// Flag shared with the interrupt handler and output gate.
    pub fn running_flag(&self) -> RunningFlag {
        self.running.clone()
    }

    /// Sandboxes registered so far.
    pub fn registry(&self) -> &CleanupRegistry {
        &self.registry
    }

    /// The operator channel.
    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    /// Current top-level phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Sandbox directory for `source`.
    pub fn sandbox_path_for(&self, source: &str) -> PathBuf {
        sandbox_path(&self.config.sandbox_root, source)
    }

    /// Runs sessions until the operator declines another one, then cleans up.
    ///
    /// An interrupt while no process is live abandons the current step; the
    /// configured [`InterruptPolicy`] decides whether cleanup still happens.
    /// A further interrupt during cleanup abandons it.
    pub async fn run(&mut self, shutdown: &mut ShutdownSignal) -> RunSummary {
        let mut sessions = Vec::new();

        let ended = tokio::select! {
            biased;
            _ = shutdown.requested() => LoopEnd::Interrupted,
            ended = self.session_loop(&mut sessions) => ended,
        };
        tracing::info!(ended = ?ended, sessions = sessions.len(), "session loop finished");

        let interrupted = ended == LoopEnd::Interrupted;
        if interrupted && self.config.interrupt == InterruptPolicy::Exit {
            self.set_phase(Phase::Terminated);
            self.prompter.say(FAREWELL).await;
            return RunSummary {
                sessions,
                cleanup: None,
                interrupted,
            };
        }

        self.set_phase(Phase::CleaningUp);
        let cleanup = tokio::select! {
            biased;
            _ = shutdown.requested() => None,
            report = self.registry.drain(&self.prompter) => Some(report),
        };
        let abandoned = cleanup.is_none();
        if abandoned {
            tracing::info!("cleanup abandoned by interrupt");
        }

        self.set_phase(Phase::Terminated);
        self.prompter.say(FAREWELL).await;

        RunSummary {
            sessions,
            cleanup,
            interrupted: interrupted || abandoned,
        }
    }

    async fn session_loop(&mut self, sessions: &mut Vec<SessionOutcome>) -> LoopEnd {
        loop {
            self.set_phase(Phase::Prompting);
            let request = match self.prompt_request().await {
                Ok(request) => request,
                Err(e) => {
                    tracing::info!(error = %e, "stopped prompting for sessions");
                    return LoopEnd::InputClosed;
                }
            };

            let outcome = self.run_session(request).await;
            sessions.push(outcome);

            self.set_phase(Phase::AwaitingRestart);
            match self.prompter.confirm("Clone another repo?", true).await {
                Ok(true) => continue,
                Ok(false) => return LoopEnd::Declined,
                Err(e) => {
                    tracing::info!(error = %e, "no answer to restart prompt");
                    return LoopEnd::InputClosed;
                }
            }
        }
    }

    /// Collects a session request from the operator.
    pub async fn prompt_request(&self) -> Result<SessionRequest> {
        self.prompter.say("Welcome to git-fly").await;
        self.prompter
            .say("Temporarily clone/run/open git repos on the fly")
            .await;

        let repo_source = required_input(
            &self.prompter,
            "repo URL (required):",
            self.default_source.as_deref(),
            "You must enter a repo URL",
        )
        .await?;
        let run_command = self.prompt_command("run command:").await?;
        let open_command = self.prompt_command("open command:").await?;

        Ok(SessionRequest {
            repo_source,
            run_command,
            open_command,
        })
    }

    async fn prompt_command(&self, message: &str) -> Result<Option<CommandLine>> {
        loop {
            let answer = self.prompter.input(message, None).await?;
            match CommandLine::parse(&answer) {
                Ok(command) => return Ok(command),
                Err(e) => self.prompter.warn(&e.to_string()).await,
            }
        }
    }

    /// Runs one session to the point where the operator is asked to restart.
    pub async fn run_session(&mut self, request: SessionRequest) -> SessionOutcome {
        let path = self.sandbox_path_for(&request.repo_source);
        let mut state = SessionState::new(path.clone());
        let mut outcome = SessionOutcome::new(path.clone());

        tracing::info!(source = %request.repo_source, path = ?path, "starting session");

        if let Err(e) = tokio::fs::create_dir_all(&self.config.sandbox_root).await {
            tracing::warn!(root = ?self.config.sandbox_root, error = %e, "failed to create sandbox root");
        }

        state.enter(Phase::Cloning);
        let fetch = match self.clone_with_conflict_handling(&request.repo_source, &mut state).await {
            Ok(fetch) => fetch,
            Err(e) => {
                self.prompter.warn(&e.to_string()).await;
                outcome.error = Some(e.to_string());
                return finish(state, outcome);
            }
        };
        outcome.fetch = Some(fetch.clone());

        match fetch {
            FetchOutcome::Success => {
                outcome.registered = self.registry.register(path.clone());
                if let Some(open) = &request.open_command {
                    if let Err(e) = self.runner.launch_detached(open, &path) {
                        self.prompter.warn(&format!("Could not open sandbox: {}", e)).await;
                    }
                }
            }
            FetchOutcome::AlreadyExists => {
                tracing::info!(path = ?path, "continuing with existing sandbox");
            }
            FetchOutcome::Failure(detail) => {
                self.prompter
                    .warn(&format!("Error cloning repo: {}", detail))
                    .await;
                outcome.error = Some(detail);
                return finish(state, outcome);
            }
        }

        match self.install_dependencies(&path, &mut state).await {
            Ok(install) => outcome.install = install,
            Err(e) => {
                self.prompter.warn(&e.to_string()).await;
                outcome.error = Some(e.to_string());
                return finish(state, outcome);
            }
        }

        state.enter(Phase::Running);
        if let Some(run) = &request.run_command {
            let start = format!("Running {}...", run);
            match self.supervise(run, &path, &start, "Finished running.").await {
                Ok(exit) => outcome.run = Some(exit),
                Err(e) => {
                    self.prompter.warn(&e.to_string()).await;
                    outcome.error = Some(e.to_string());
                }
            }
        }

        finish(state, outcome)
    }

    /// Fetches, offering one remove-and-retry if the sandbox already exists.
    ///
    /// Returns `AlreadyExists` only when the operator chose to keep the
    /// existing directory.
    async fn clone_with_conflict_handling(
        &self,
        source: &str,
        state: &mut SessionState,
    ) -> Result<FetchOutcome> {
        let path = state.sandbox_path().clone();
        self.prompter
            .say(&format!("Cloning {} into {}", source, path.display()))
            .await;

        let fetch = self.fetcher.fetch(source, &path).await;
        if fetch != FetchOutcome::AlreadyExists {
            return Ok(fetch);
        }

        state.enter(Phase::CloneConflict);
        let question = format!(
            "{} already exists. Remove it and clone again?",
            path.display()
        );
        if !self.prompter.confirm(&question, false).await? {
            return Ok(FetchOutcome::AlreadyExists);
        }

        self.prompter
            .say(&format!("Removing {}...", path.display()))
            .await;
        remove_sandbox(&path).await?;

        state.enter(Phase::Cloning);
        match self.fetcher.fetch(source, &path).await {
            FetchOutcome::AlreadyExists => Ok(FetchOutcome::Failure(format!(
                "{} still exists after removal",
                path.display()
            ))),
            fetch => Ok(fetch),
        }
    }

    /// Offers the first matching install rule and runs it if confirmed.
    async fn install_dependencies(
        &self,
        path: &Path,
        state: &mut SessionState,
    ) -> Result<Option<ExitInfo>> {
        let Some(rule) = self.config.install_rule_for(path) else {
            return Ok(None);
        };

        let question = format!("{} detected! Run {}?", rule.manifest, rule.command);
        if !self.prompter.confirm(&question, false).await? {
            tracing::info!(manifest = %rule.manifest, "dependency install declined");
            return Ok(None);
        }

        state.enter(Phase::Installing);
        let command = rule.command_line()?;
        let exit = self
            .supervise(&command, path, "Installing dependencies...", "Finished installing!")
            .await?;
        Ok(Some(exit))
    }

    /// Spawns `command` with output gated on the running flag and waits for it.
    async fn supervise(
        &self,
        command: &CommandLine,
        dir: &Path,
        start: &str,
        done: &str,
    ) -> Result<ExitInfo> {
        self.prompter.say(start).await;

        self.running.set(true);
        let handle = match self.runner.spawn(command, dir, self.running.gate()) {
            Ok(handle) => handle,
            Err(e) => {
                self.running.set(false);
                return Err(e);
            }
        };
        let result = handle.wait().await;
        self.running.set(false);
        let exit = result?;

        self.prompter.say(done).await;
        if !exit.success {
            let status = exit
                .code
                .map(|c| format!("status {}", c))
                .unwrap_or_else(|| "a signal".to_string());
            self.prompter
                .warn(&format!("{} exited with {}", command.program, status))
                .await;
        }

        Ok(exit)
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::debug!(from = %self.phase, to = %phase, "orchestrator phase change");
            self.phase = phase;
        }
    }
}

fn finish(mut state: SessionState, mut outcome: SessionOutcome) -> SessionOutcome {
    state.enter(Phase::AwaitingRestart);
    outcome.phases = state.history().to_vec();
    outcome
}
