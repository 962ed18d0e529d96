// src/result.rs

//! Result Aggregator: pure conversion of an [`AdapterOutcome`] into the
//! [`ExecutionResult`] handed back to the caller.

use std::time::Duration;

use serde::Serialize;

use crate::runner::{AdapterOutcome, FinalState};

/// How the run ended, as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Completed,
    Aborted,
    SpawnFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitInfo {
    pub disposition: Disposition,
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    /// The runner had to be killed after ignoring the terminate signal.
    pub forced_kill: bool,
    /// Some output was dropped because of the buffer limit.
    pub output_truncated: bool,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

/// Outcome of one admitted execution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub status: bool,
    pub raw_output: String,
    pub exit: ExitInfo,
}

impl ExecutionResult {
    /// Result for a run whose task died before the adapter could report.
    pub fn internal_failure(diagnostic: impl Into<String>) -> Self {
        Self {
            status: false,
            raw_output: diagnostic.into(),
            exit: ExitInfo {
                disposition: Disposition::SpawnFailed,
                exit_code: None,
                signal: None,
                forced_kill: false,
                output_truncated: false,
                elapsed: Duration::ZERO,
            },
        }
    }
}

pub const ABORT_NOTE: &str = "Execution aborted.";
const TRUNCATION_NOTE: &str = "[output truncated]";

/// Build the caller-facing result. Deterministic, no IO.
pub fn aggregate(outcome: &AdapterOutcome) -> ExecutionResult {
    let mut raw_output = String::new();
    for line in outcome.output.lines() {
        raw_output.push_str(&line.text);
        raw_output.push('\n');
    }
    if outcome.output.is_truncated() {
        raw_output.push_str(TRUNCATION_NOTE);
        raw_output.push('\n');
    }

    let (status, exit_code, signal, forced_kill, disposition) = match &outcome.state {
        FinalState::Completed { exit_code, signal } => (
            *exit_code == Some(0),
            *exit_code,
            *signal,
            false,
            Disposition::Completed,
        ),
        FinalState::Aborted { forced_kill } => {
            raw_output.push_str(ABORT_NOTE);
            raw_output.push('\n');
            (false, None, None, *forced_kill, Disposition::Aborted)
        }
        FinalState::SpawnFailed { diagnostic } => {
            raw_output = diagnostic.clone();
            (false, None, None, false, Disposition::SpawnFailed)
        }
    };

    ExecutionResult {
        status,
        raw_output,
        exit: ExitInfo {
            disposition,
            exit_code,
            signal,
            forced_kill,
            output_truncated: outcome.output.is_truncated(),
            elapsed: outcome.elapsed,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{OutputBuffer, Stream};

    fn outcome(state: FinalState, lines: &[&str]) -> AdapterOutcome {
        let mut output = OutputBuffer::new(1024);
        for line in lines {
            output.push(Stream::Stdout, *line);
        }
        AdapterOutcome {
            state,
            output,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn zero_exit_is_success() {
        let result = aggregate(&outcome(
            FinalState::Completed {
                exit_code: Some(0),
                signal: None,
            },
            &["Specifications: 1 executed", "Scenarios: 2 executed"],
        ));

        assert!(result.status);
        assert_eq!(
            result.raw_output,
            "Specifications: 1 executed\nScenarios: 2 executed\n"
        );
        assert_eq!(result.exit.exit_code, Some(0));
    }

    #[test]
    fn aborted_is_failure_even_with_passing_output() {
        let result = aggregate(&outcome(
            FinalState::Aborted { forced_kill: true },
            &["Successfully generated html-report"],
        ));

        assert!(!result.status);
        assert_eq!(result.exit.disposition, Disposition::Aborted);
        assert!(result.exit.forced_kill);
        assert!(result.raw_output.ends_with("Execution aborted.\n"));
    }

    #[test]
    fn spawn_failure_carries_diagnostic_only() {
        let result = aggregate(&outcome(
            FinalState::SpawnFailed {
                diagnostic: "failed to start runner `gauge`: not found".to_string(),
            },
            &[],
        ));

        assert!(!result.status);
        assert_eq!(result.raw_output, "failed to start runner `gauge`: not found");
    }

    #[test]
    fn killed_by_signal_is_failure() {
        let result = aggregate(&outcome(
            FinalState::Completed {
                exit_code: None,
                signal: Some(9),
            },
            &[],
        ));
        assert!(!result.status);
        assert_eq!(result.exit.signal, Some(9));
    }
}
