// src/controller/run.rs

//! Body of one admitted run, executed on its own Tokio task.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};

use crate::gate::RunPermit;
use crate::report::{Report, ReportPublisher};
use crate::result::{ExecutionResult, aggregate};
use crate::runner::{AdapterOutcome, FinalState, OutputBuffer, RunnerBackend};

use super::{ExecutionRequest, ReportArtifacts};

/// Drive `request` to a result.
///
/// The permit is released before the report is published so a slow or
/// failing report sink can never hold up the next run.
pub(crate) async fn run_admitted(
    request: ExecutionRequest,
    permit: RunPermit,
    runner: Arc<dyn RunnerBackend>,
    publisher: Arc<ReportPublisher>,
    artifacts: ReportArtifacts,
) -> ExecutionResult {
    info!(run_target = %request.target, "execution started");

    let outcome = run_backend(runner, &request, &permit).await;

    let release = permit.release();
    let outcome = if release.abort_requested {
        outcome.into_aborted()
    } else {
        outcome
    };

    let result = aggregate(&outcome);
    info!(
        status = result.status,
        disposition = ?result.exit.disposition,
        exit_code = ?result.exit.exit_code,
        since_submit_ms = since_submit(&request).as_millis() as u64,
        "execution finished"
    );

    let report = Report::new(request.run_id, request.target.clone(), result.clone())
        .with_html_report(artifacts.probe());
    let published = tokio::task::spawn_blocking(move || publisher.publish(report)).await;
    if let Err(e) = published {
        warn!(error = %e, "report publication failed");
    }

    result
}

/// Run the backend on its own task so a panicking backend turns into a
/// failed outcome instead of taking the whole run down.
async fn run_backend(
    runner: Arc<dyn RunnerBackend>,
    request: &ExecutionRequest,
    permit: &RunPermit,
) -> AdapterOutcome {
    let target = request.target.clone();
    let cancel = permit.cancellation();
    let task = tokio::spawn(async move { runner.run(target, cancel).await });

    match task.await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "runner backend failed");
            AdapterOutcome {
                state: FinalState::SpawnFailed {
                    diagnostic: format!("runner backend failed: {e}"),
                },
                output: OutputBuffer::new(0),
                elapsed: Duration::ZERO,
            }
        }
    }
}

fn since_submit(request: &ExecutionRequest) -> Duration {
    SystemTime::now()
        .duration_since(request.submitted_at)
        .unwrap_or_default()
}
