// src/runner/mod.rs

//! Runner Process Adapter.
//!
//! Owns the external runner process for one admitted request:
//! `Spawning -> Streaming -> {Completed | Aborted | SpawnFailed}`.
//!
//! - [`command`] builds argv-style runner invocations from configuration.
//! - [`lines`] reads runner pipes as capped, lossily decoded lines.
//! - [`output`] buffers those lines in arrival order.
//! - [`process`] drives the process lifecycle and termination.
//! - [`backend`] provides the `RunnerBackend` trait the controller talks to,
//!   so tests can swap in a fake runner.

pub mod backend;
pub mod command;
pub mod lines;
pub mod output;
pub mod process;

use std::time::Duration;

pub use backend::{ProcessRunner, RunnerBackend};
pub use command::{RunnerCommand, RunnerTemplate};
pub use output::{OutputBuffer, OutputLine, Stream};
pub use process::{ProcessSettings, run_process};

/// Where the adapter's state machine ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalState {
    /// The process exited on its own.
    Completed {
        exit_code: Option<i32>,
        signal: Option<i32>,
    },
    /// Cancellation was observed; `forced_kill` records that the process
    /// outlived the grace period after the terminate signal.
    Aborted { forced_kill: bool },
    /// The process never started.
    SpawnFailed { diagnostic: String },
}

/// Everything the adapter hands back for one run.
#[derive(Debug, Clone)]
pub struct AdapterOutcome {
    pub state: FinalState,
    pub output: OutputBuffer,
    pub elapsed: Duration,
}

impl AdapterOutcome {
    /// Abort wins over a natural exit that raced with it.
    pub fn into_aborted(mut self) -> Self {
        if let FinalState::Completed { .. } = self.state {
            self.state = FinalState::Aborted { forced_kill: false };
        }
        self
    }
}
