// src/runner/backend.rs

//! Pluggable runner backend abstraction.
//!
//! The controller talks to a `RunnerBackend` instead of spawning processes
//! itself. `ProcessRunner` is the production implementation; tests provide
//! their own backends that script outcomes without touching the OS.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::config::ConfigFile;
use crate::target::ResolvedTarget;

use super::AdapterOutcome;
use super::command::RunnerTemplate;
use super::process::{ProcessSettings, run_process};

/// Trait abstracting how a resolved target is executed.
///
/// Implementations must observe `cancel` and must not return while the
/// process they started is still alive.
pub trait RunnerBackend: Send + Sync {
    fn run(
        &self,
        target: ResolvedTarget,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = AdapterOutcome> + Send + '_>>;
}

/// Runs the configured external runner binary.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    template: RunnerTemplate,
    settings: ProcessSettings,
}

impl ProcessRunner {
    pub fn new(template: RunnerTemplate, settings: ProcessSettings) -> Self {
        Self { template, settings }
    }

    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self::new(
            RunnerTemplate::from_config(cfg),
            ProcessSettings::from_config(cfg),
        )
    }
}

impl RunnerBackend for ProcessRunner {
    fn run(
        &self,
        target: ResolvedTarget,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = AdapterOutcome> + Send + '_>> {
        let command = self.template.command_for(&target);
        let settings = self.settings.clone();

        Box::pin(async move { run_process(&command, cancel, &settings).await })
    }
}
