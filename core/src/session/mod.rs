//! Interactive sessions.
//!
//! A session clones one repository into its sandbox, optionally installs
//! dependencies and runs a command there. The [`Orchestrator`] loops over
//! sessions and reconciles every sandbox it created when the operator is done.

mod orchestrator;
mod state;

pub use orchestrator::{Orchestrator, RunSummary};
pub use state::{Phase, SessionOutcome, SessionRequest, SessionState};
