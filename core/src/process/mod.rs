//! Process supervision: spawning commands and streaming their output.
//!
//! [`ProcessRunner`] spawns one child at a time and forwards its decoded
//! output through a [`Gate`]. The orchestrator's gate is backed by a
//! [`RunningFlag`], which the interrupt handler can clear to silence a
//! child without killing it.

mod command;
mod decode;
mod runner;

pub use command::CommandLine;
pub use decode::Utf8Decoder;
pub use runner::{
    ChildHandle, ConsoleSink, ExitInfo, Gate, OutputSink, ProcessOutput, ProcessRunner,
};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared "a supervised process is live and not cancelled" flag.
#[derive(Debug, Clone, Default)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value.
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag.
    pub fn set(&self, running: bool) {
        self.0.store(running, Ordering::SeqCst);
    }

    /// Clears the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    /// Returns a gate that reads this flag at every call.
    pub fn gate(&self) -> Gate {
        let flag = self.0.clone();
        Arc::new(move || flag.load(Ordering::SeqCst))
    }
}
