//! Operator interrupt (Ctrl-C) handling.
//!
//! An interrupt while a supervised process is live only silences that
//! process's output; the process keeps running. An interrupt at any other
//! time is a shutdown request, delivered through [`ShutdownSignal`].

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::process::RunningFlag;

/// What a single interrupt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// A live process was silenced.
    SilencedOutput,
    /// No process was live; shutdown was requested.
    Shutdown,
}

/// Applies interrupts to the running flag and the shutdown channel.
#[derive(Debug, Clone)]
pub struct InterruptHandler {
    running: RunningFlag,
    requests: Arc<watch::Sender<u32>>,
}

impl InterruptHandler {
    /// Handles one interrupt.
    pub fn handle(&self) -> InterruptAction {
        if self.running.take() {
            tracing::info!("interrupt received, silencing running process");
            InterruptAction::SilencedOutput
        } else {
            self.requests.send_modify(|count| *count += 1);
            tracing::info!("interrupt received, shutdown requested");
            InterruptAction::Shutdown
        }
    }
}

/// Receiving side of shutdown requests.
#[derive(Debug)]
pub struct ShutdownSignal {
    rx: watch::Receiver<u32>,
    seen: u32,
}

impl ShutdownSignal {
    /// Resolves once per shutdown request.
    ///
    /// Requests are counted: two interrupts resolve two calls. Cancel-safe.
    pub async fn requested(&mut self) {
        loop {
            if *self.rx.borrow_and_update() > self.seen {
                self.seen += 1;
                return;
            }
            if self.rx.changed().await.is_err() {
                // Handler gone: no more requests can arrive.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Total shutdown requests received so far.
    pub fn requests(&self) -> u32 {
        *self.rx.borrow()
    }
}

/// Creates a connected handler and shutdown signal.
pub fn channel(running: RunningFlag) -> (InterruptHandler, ShutdownSignal) {
    let (tx, rx) = watch::channel(0);
    (
        InterruptHandler {
            running,
            requests: Arc::new(tx),
        },
        ShutdownSignal { rx, seen: 0 },
    )
}

/// Installs a Ctrl-C listener that feeds an [`InterruptHandler`].
pub fn install(running: RunningFlag) -> (JoinHandle<()>, ShutdownSignal) {
    let (handler, signal) = channel(running);

    let task = tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                break;
            }
            if handler.handle() == InterruptAction::SilencedOutput {
                eprintln!("\n(output silenced; the process keeps running until it exits)");
            }
        }
    });

    (task, signal)
}
