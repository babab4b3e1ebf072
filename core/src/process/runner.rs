//! Child process spawning with gated output forwarding.

use std::io::Write;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

use super::command::CommandLine;
use super::decode::Utf8Decoder;

const READ_CHUNK: usize = 8 * 1024;

/// Predicate consulted before each output chunk is forwarded.
pub type Gate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Decoded output from a child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutput {
    /// Text read from the child's stdout.
    Stdout(String),
    /// Text read from the child's stderr.
    Stderr(String),
}

/// Destination for forwarded process output.
pub trait OutputSink: Send + Sync {
    /// Receives one decoded chunk.
    fn emit(&self, output: ProcessOutput);
}

/// Sink that writes to this process's stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl OutputSink for ConsoleSink {
    fn emit(&self, output: ProcessOutput) {
        // Console write failures (closed pipe) are not worth surfacing.
        match output {
            ProcessOutput::Stdout(text) => {
                let mut out = std::io::stdout().lock();
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            ProcessOutput::Stderr(text) => {
                let mut err = std::io::stderr().lock();
                let _ = err.write_all(text.as_bytes());
                let _ = err.flush();
            }
        }
    }
}

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Whether the exit status signals success.
    pub success: bool,
    /// Chunks forwarded to the sink.
    pub delivered: usize,
    /// Chunks read while the gate was closed.
    pub suppressed: usize,
}

impl ExitInfo {
    fn new(status: ExitStatus, counters: &ForwardCounters) -> Self {
        Self {
            code: status.code(),
            success: status.success(),
            delivered: counters.delivered.load(Ordering::SeqCst),
            suppressed: counters.suppressed.load(Ordering::SeqCst),
        }
    }
}

#[derive(Debug, Default)]
struct ForwardCounters {
    delivered: AtomicUsize,
    suppressed: AtomicUsize,
}

#[derive(Debug, Clone, Copy)]
enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    fn wrap(self, text: String) -> ProcessOutput {
        match self {
            StreamKind::Stdout => ProcessOutput::Stdout(text),
            StreamKind::Stderr => ProcessOutput::Stderr(text),
        }
    }
}

/// A live child process and its output forwarders.
///
/// Consumed by [`wait`](ChildHandle::wait), so completion is observed once.
pub struct ChildHandle {
    program: String,
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
    counters: Arc<ForwardCounters>,
}

impl ChildHandle {
    /// Waits for both output streams to close and the process to exit.
    pub async fn wait(mut self) -> Result<ExitInfo> {
        for forwarder in self.forwarders.drain(..) {
            if let Err(e) = forwarder.await {
                tracing::error!(program = %self.program, error = %e, "output forwarder failed");
            }
        }

        let status = self.child.wait().await?;
        let info = ExitInfo::new(status, &self.counters);

        tracing::debug!(
            program = %self.program,
            code = ?info.code,
            delivered = info.delivered,
            suppressed = info.suppressed,
            "child process exited"
        );

        Ok(info)
    }
}

/// Spawns child processes and streams their output to a sink.
#[derive(Clone)]
pub struct ProcessRunner {
    sink: Arc<dyn OutputSink>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::console()
    }
}

impl ProcessRunner {
    /// Creates a runner forwarding to `sink`.
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self { sink }
    }

    /// Creates a runner forwarding to the console.
    pub fn console() -> Self {
        Self::new(Arc::new(ConsoleSink))
    }

    /// Spawns `command` in `working_dir`.
    ///
    /// Every decoded chunk is forwarded only if `gate()` holds at the moment
    /// it is delivered. The child is never killed by the runner.
    pub fn spawn(&self, command: &CommandLine, working_dir: &Path, gate: Gate) -> Result<ChildHandle> {
        tracing::info!(
            program = %command.program,
            args = ?command.args,
            working_dir = ?working_dir,
            "spawning child process"
        );

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let counters = Arc::new(ForwardCounters::default());
        let mut forwarders = Vec::with_capacity(2);

        if let Some(stdout) = child.stdout.take() {
            forwarders.push(tokio::spawn(forward(
                stdout,
                StreamKind::Stdout,
                gate.clone(),
                self.sink.clone(),
                counters.clone(),
            )));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.push(tokio::spawn(forward(
                stderr,
                StreamKind::Stderr,
                gate,
                self.sink.clone(),
                counters.clone(),
            )));
        }

        Ok(ChildHandle {
            program: command.program.clone(),
            child,
            forwarders,
            counters,
        })
    }

    /// Starts `command` with `path` appended and does not wait for it.
    pub fn launch_detached(&self, command: &CommandLine, path: &Path) -> Result<()> {
        let command = command.with_arg(path.to_string_lossy());

        tracing::info!(program = %command.program, args = ?command.args, "launching detached process");

        Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::Spawn {
                program: command.program.clone(),
                source,
            })?;

        Ok(())
    }
}

async fn forward<R>(
    mut reader: R,
    kind: StreamKind,
    gate: Gate,
    sink: Arc<dyn OutputSink>,
    counters: Arc<ForwardCounters>,
) where
    R: AsyncRead + Unpin,
{
    let mut decoder = Utf8Decoder::new();
    let mut buf = vec![0u8; READ_CHUNK];

    let deliver = |text: String| {
        if text.is_empty() {
            return;
        }
        if gate() {
            counters.delivered.fetch_add(1, Ordering::SeqCst);
            sink.emit(kind.wrap(text));
        } else {
            counters.suppressed.fetch_add(1, Ordering::SeqCst);
        }
    };

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => deliver(decoder.decode(&buf[..n])),
            Err(e) => {
                tracing::warn!(stream = ?kind, error = %e, "error reading child output");
                break;
            }
        }
    }

    deliver(decoder.finish());
}
