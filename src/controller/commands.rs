// src/controller/commands.rs

//! Editor-facing commands.

use std::str::FromStr;
use std::sync::Arc;

use crate::errors::{ControllerError, Result};
use crate::report::Report;
use crate::target::Target;

use super::{ExecutionController, RunHandle};

/// Logical commands an editor (or the CLI session) can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Execute a path or `path:line`.
    Execute(String),
    /// Execute the currently open specification.
    ExecuteSpec,
    /// Execute every specification in the project's specs directory.
    ExecuteAllSpecs,
    /// Execute the scenario under the cursor.
    ExecuteScenario,
    /// Re-run whatever failed in the runner's previous run.
    ExecuteFailed,
    /// Run the last admitted target again.
    RepeatLastRun,
    StopExecution,
    ShowReport,
}

#[derive(Debug)]
pub enum CommandOutcome {
    /// A run was admitted; await the handle for its result.
    Started(RunHandle),
    /// `true` if an in-flight run was asked to stop.
    StopRequested(bool),
    Report(Option<Arc<Report>>),
}

impl FromStr for Command {
    type Err = ControllerError;

    /// Parse the session syntax: `execute <target>`, `spec`, `all`,
    /// `scenario`, `failed`, `repeat`, `stop`, `report`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (word, rest) = match s.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (s, ""),
        };

        match word.to_lowercase().as_str() {
            "execute" | "run" if !rest.is_empty() => Ok(Command::Execute(rest.to_string())),
            "execute" | "run" => Err(ControllerError::UnresolvedContext(
                "execute needs a path or path:line".to_string(),
            )),
            "spec" => Ok(Command::ExecuteSpec),
            "all" => Ok(Command::ExecuteAllSpecs),
            "scenario" => Ok(Command::ExecuteScenario),
            "failed" => Ok(Command::ExecuteFailed),
            "repeat" => Ok(Command::RepeatLastRun),
            "stop" => Ok(Command::StopExecution),
            "report" => Ok(Command::ShowReport),
            other => Err(ControllerError::UnresolvedContext(format!(
                "unknown command '{other}'"
            ))),
        }
    }
}

impl ExecutionController {
    /// Run one editor command. Only admission and target resolution errors
    /// are returned as `Err`; run failures arrive inside the result.
    pub fn dispatch(&self, command: Command) -> Result<CommandOutcome> {
        let handle = match command {
            Command::Execute(raw) => self.execute(Target::parse(&raw)?)?,
            Command::ExecuteSpec => self.execute(Target::CurrentlyOpenSpecification)?,
            Command::ExecuteAllSpecs => self.execute(Target::AllSpecsInDirectory(None))?,
            Command::ExecuteScenario => self.execute(Target::ScenarioAtCursor)?,
            Command::ExecuteFailed => self.execute(Target::PreviouslyFailed)?,
            Command::RepeatLastRun => self.repeat_last_run()?,
            Command::StopExecution => {
                return Ok(CommandOutcome::StopRequested(self.stop_execution()));
            }
            Command::ShowReport => return Ok(CommandOutcome::Report(self.show_report())),
        };
        Ok(CommandOutcome::Started(handle))
    }
}
