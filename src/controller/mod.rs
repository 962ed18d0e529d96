// src/controller/mod.rs

//! Execution controller.
//!
//! Ties the pieces together for every request:
//! resolve target → admit through the gate → run on a background task →
//! release the gate → aggregate → publish the report → deliver the result.
//!
//! Admission is synchronous: [`ExecutionController::submit`] either returns a
//! [`RunHandle`] right away or fails with `AdmissionRejected`. The result is
//! delivered later through the handle. Stopping is a separate channel
//! ([`ExecutionController::stop_execution`]) that never waits.

pub mod commands;
pub mod run;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info_span};

use crate::config::ConfigFile;
use crate::errors::{ControllerError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::gate::{AdmissionGate, ExecutionState, RunId};
use crate::report::{FileReportSink, Report, ReportPublisher};
use crate::result::ExecutionResult;
use crate::runner::{ProcessRunner, RunnerBackend};
use crate::target::{EditorContext, ProjectScope, ResolvedTarget, Target, resolve};

pub use commands::{Command, CommandOutcome};

/// One admitted invocation. Never mutated.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub run_id: RunId,
    pub target: ResolvedTarget,
    pub submitted_at: SystemTime,
}

/// Awaitable completion of an admitted run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    target: ResolvedTarget,
    task: JoinHandle<ExecutionResult>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn target(&self) -> &ResolvedTarget {
        &self.target
    }

    /// Wait for the run's result. Always yields exactly one result.
    pub async fn wait(self) -> ExecutionResult {
        match self.task.await {
            Ok(result) => result,
            Err(e) => ExecutionResult::internal_failure(format!(
                "execution task for run {} ended abnormally: {e}",
                self.run_id
            )),
        }
    }
}

/// Where the runner leaves its own HTML report, if configured.
#[derive(Debug, Clone)]
pub(crate) struct ReportArtifacts {
    fs: Arc<dyn FileSystem>,
    html_report: Option<PathBuf>,
}

impl ReportArtifacts {
    fn probe(&self) -> Option<PathBuf> {
        self.html_report
            .as_ref()
            .filter(|p| self.fs.exists(p))
            .cloned()
    }
}

pub struct ExecutionController {
    gate: Arc<AdmissionGate>,
    runner: Arc<dyn RunnerBackend>,
    publisher: Arc<ReportPublisher>,
    editor: Arc<dyn EditorContext>,
    scope: ProjectScope,
    artifacts: ReportArtifacts,
    last_target: Mutex<Option<ResolvedTarget>>,
}

impl std::fmt::Debug for ExecutionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionController")
            .field("state", &self.gate.state())
            .field("scope", &self.scope)
            .field("publisher", &self.publisher)
            .finish_non_exhaustive()
    }
}

impl ExecutionController {
    /// Controller starting `Idle` with no published report.
    pub fn new(
        scope: ProjectScope,
        runner: Arc<dyn RunnerBackend>,
        publisher: ReportPublisher,
        editor: Arc<dyn EditorContext>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            gate: Arc::new(AdmissionGate::new()),
            runner,
            publisher: Arc::new(publisher),
            editor,
            scope,
            artifacts: ReportArtifacts {
                fs,
                html_report: None,
            },
            last_target: Mutex::new(None),
        }
    }

    /// Production wiring: real runner process, real filesystem, optional
    /// report file.
    pub fn from_config(cfg: &ConfigFile, editor: Arc<dyn EditorContext>) -> Result<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let mut publisher = ReportPublisher::new();
        if let Some(path) = cfg.report_persist_path() {
            publisher = publisher.with_sink(FileReportSink::new(Arc::clone(&fs), path));
        }

        let controller = Self::new(
            ProjectScope::from_config(cfg)?,
            Arc::new(ProcessRunner::from_config(cfg)),
            publisher,
            editor,
            fs,
        )
        .with_html_report(cfg.html_report_path());
        Ok(controller)
    }

    pub fn with_html_report(mut self, path: Option<PathBuf>) -> Self {
        self.artifacts.html_report = path;
        self
    }

    pub fn state(&self) -> ExecutionState {
        self.gate.state()
    }

    /// Resolve and admit `target`. Must be called from within a Tokio runtime.
    pub fn execute(&self, target: Target) -> Result<RunHandle> {
        let resolved = resolve(&target, self.editor.as_ref(), &self.scope)?;
        self.submit(resolved)
    }

    /// Execute and wait for the result in one call.
    pub async fn execute_and_wait(&self, target: Target) -> Result<ExecutionResult> {
        let handle = self.execute(target)?;
        Ok(handle.wait().await)
    }

    /// Re-run the last admitted target.
    pub fn repeat_last_run(&self) -> Result<RunHandle> {
        let last = self
            .last_target
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match last {
            Some(target) => self.submit(target),
            None => Err(ControllerError::UnresolvedContext(
                "no previous run to repeat".to_string(),
            )),
        }
    }

    /// Admit an already resolved target.
    pub fn submit(&self, target: ResolvedTarget) -> Result<RunHandle> {
        let permit = self.gate.try_acquire()?;
        let request = ExecutionRequest {
            run_id: permit.run_id(),
            target: target.clone(),
            submitted_at: SystemTime::now(),
        };
        *self.last_target.lock().unwrap_or_else(|e| e.into_inner()) = Some(target.clone());

        let run_id = request.run_id;
        debug!(run_id, run_target = %target, "execution admitted");

        let span = info_span!("run", run_id);
        let task = tokio::spawn(
            run::run_admitted(
                request,
                permit,
                Arc::clone(&self.runner),
                Arc::clone(&self.publisher),
                self.artifacts.clone(),
            )
            .instrument(span),
        );

        Ok(RunHandle {
            run_id,
            target,
            task,
        })
    }

    /// Ask the in-flight run to stop. Returns immediately; `false` when
    /// there was nothing to stop.
    pub fn stop_execution(&self) -> bool {
        self.gate.request_abort()
    }

    /// The last published report; `None` before the first completed run.
    pub fn show_report(&self) -> Option<Arc<Report>> {
        self.publisher.current_report()
    }
}
