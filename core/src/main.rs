//! git-fly CLI
//!
//! Interactive tool for temporarily cloning, running and opening git repos.

use std::path::PathBuf;

use clap::Parser;

use git_fly::config::{Config, Validate};
use git_fly::process::ProcessRunner;
use git_fly::prompt;
use git_fly::sandbox::GitClone;
use git_fly::session::Orchestrator;
use git_fly::signal;

/// Exit code after an interrupt-driven shutdown (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, Parser)]
#[command(name = "git-fly", version, about = "Temporarily clone/run/open git repos on the fly")]
struct Cli {
    /// Repo URL offered as the default answer to the first prompt.
    repo: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory under which sandboxes are created.
    #[arg(long, value_name = "DIR")]
    sandbox_root: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> git_fly::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(root) = &cli.sandbox_root {
        config = config.with_sandbox_root(root);
    }

    for warning in config.validate().into_result()? {
        tracing::warn!("{}", warning);
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so they never interleave with prompts on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("git-fly: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(root = ?config.sandbox_root, interrupt = ?config.interrupt, "starting git-fly");

    let clone = GitClone::with_program(config.git_program.clone());
    let mut orchestrator = Orchestrator::new(config, clone, ProcessRunner::console(), prompt::stdio())
        .with_default_source(cli.repo);

    let (listener, mut shutdown) = signal::install(orchestrator.running_flag());
    let summary = orchestrator.run(&mut shutdown).await;
    listener.abort();

    tracing::info!(
        sessions = summary.sessions.len(),
        interrupted = summary.interrupted,
        "git-fly finished"
    );

    // Exit explicitly: a pending stdin read would otherwise hold up runtime shutdown.
    std::process::exit(if summary.interrupted { EXIT_INTERRUPTED } else { 0 });
}
