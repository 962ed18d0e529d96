// src/runner/command.rs

//! Runner command lines.
//!
//! Arguments are passed argv-style; nothing goes through a shell.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::ConfigFile;
use crate::target::ResolvedTarget;

/// Runner settings that do not vary between runs.
#[derive(Debug, Clone)]
pub struct RunnerTemplate {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub failed_flag: OsString,
}

impl RunnerTemplate {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            program: OsString::from(&cfg.runner.program),
            args: cfg.runner.args.iter().map(OsString::from).collect(),
            working_dir: Some(cfg.runner_working_dir()),
            env: cfg.runner.env.clone(),
            failed_flag: OsString::from(&cfg.runner.failed_flag),
        }
    }

    /// Full command line for one run of `target`.
    pub fn command_for(&self, target: &ResolvedTarget) -> RunnerCommand {
        let mut args = self.args.clone();
        match target.descriptor() {
            Some(descriptor) => args.push(descriptor),
            None => args.push(self.failed_flag.clone()),
        }

        RunnerCommand {
            program: self.program.clone(),
            args,
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
        }
    }
}

/// A concrete runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
}

impl RunnerCommand {
    /// Tokio command with piped output. On Unix the runner leads its own
    /// process group so termination reaches everything it spawned.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }
}

impl fmt::Display for RunnerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
