use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use specrun::ADMISSION_REJECTED_MESSAGE;
use specrun::errors::ControllerError;
use specrun::gate::ExecutionState;
use specrun::result::Disposition;
use specrun::target::{ResolvedTarget, Target};
use specrun_test_utils::builders::controller_with;
use specrun_test_utils::fake_runner::{FakeRunner, Script};
use specrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn spec(path: &str) -> Target {
    Target::SpecificationFile(PathBuf::from(path))
}

#[tokio::test]
async fn second_request_is_rejected_while_first_runs() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().holding();
    let t = controller_with(Arc::new(runner.clone()));

    let first = t.controller.execute(spec("specs/example.spec"))?;
    assert_eq!(t.controller.state(), ExecutionState::Running);

    let err = t
        .controller
        .execute(spec("specs/other.spec"))
        .expect_err("second run must be rejected");
    assert!(matches!(err, ControllerError::AdmissionRejected));
    assert_eq!(err.to_string(), ADMISSION_REJECTED_MESSAGE);
    assert_eq!(err.to_string(), "A Specification or Scenario is still running!");

    runner.complete_one();
    let result = with_timeout(first.wait()).await;
    assert!(result.status);

    // Only the admitted run ever reached the runner.
    assert_eq!(runner.started().len(), 1);
    assert_eq!(t.controller.state(), ExecutionState::Idle);
    Ok(())
}

#[tokio::test]
async fn rejection_does_not_disturb_the_running_execution() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().holding();
    let t = controller_with(Arc::new(runner.clone()));

    let handle = t.controller.execute(Target::AllSpecsInDirectory(None))?;
    for _ in 0..3 {
        assert!(t.controller.execute(spec("specs/example.spec")).is_err());
    }

    runner.complete_one();
    let result = with_timeout(handle.wait()).await;
    assert!(result.status);
    assert_eq!(result.exit.disposition, Disposition::Completed);
    Ok(())
}

#[tokio::test]
async fn stop_execution_yields_failed_result() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().holding();
    let t = controller_with(Arc::new(runner.clone()));

    let handle = t.controller.execute(Target::AllSpecsInDirectory(None))?;
    runner.wait_for_started(1).await;

    assert!(t.controller.stop_execution());
    assert!(matches!(
        t.controller.state(),
        ExecutionState::Aborting | ExecutionState::Idle
    ));

    let result = with_timeout(handle.wait()).await;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::Aborted);
    assert!(result.raw_output.contains("Execution aborted."));
    assert_eq!(t.controller.state(), ExecutionState::Idle);
    Ok(())
}

#[tokio::test]
async fn stop_while_idle_is_a_no_op() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let t = controller_with(Arc::new(runner.clone()));

    assert!(!t.controller.stop_execution());
    assert_eq!(t.controller.state(), ExecutionState::Idle);

    // The stale stop must not leak into the next run.
    let result = with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    assert!(result.status);
    Ok(())
}

#[tokio::test]
async fn abort_wins_over_a_racing_natural_exit() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().holding().ignoring_cancel();
    let t = controller_with(Arc::new(runner.clone()));

    let handle = t.controller.execute(spec("specs/example.spec"))?;
    runner.wait_for_started(1).await;

    assert!(t.controller.stop_execution());
    // The runner finishes with exit code 0 anyway.
    runner.complete_one();

    let result = with_timeout(handle.wait()).await;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::Aborted);
    Ok(())
}

#[tokio::test]
async fn run_after_abort_is_admitted_and_passes() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().holding();
    let t = controller_with(Arc::new(runner.clone()));

    let aborted = t.controller.execute(Target::AllSpecsInDirectory(None))?;
    runner.wait_for_started(1).await;
    t.controller.stop_execution();
    assert!(!with_timeout(aborted.wait()).await.status);

    runner.set_holding(false);
    let result =
        with_timeout(t.controller.execute_and_wait(Target::AllSpecsInDirectory(None))).await?;
    assert!(result.status);
    assert_eq!(runner.started().len(), 2);
    Ok(())
}

#[tokio::test]
async fn failing_runner_exit_is_reported_not_raised() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    runner.script("specs/broken.spec", Script::Fail(1));
    let t = controller_with(Arc::new(runner.clone()));

    let result = with_timeout(t.controller.execute_and_wait(spec("specs/broken.spec"))).await?;
    assert!(!result.status);
    assert_eq!(result.exit.exit_code, Some(1));
    assert!(result.raw_output.contains("Failed Step"));
    Ok(())
}

#[tokio::test]
async fn spawn_failure_releases_the_gate() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    runner.script("specs/example.spec", Script::SpawnFail);
    let t = controller_with(Arc::new(runner.clone()));

    let result = with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::SpawnFailed);
    assert!(result.raw_output.contains("failed to start runner"));
    assert_eq!(t.controller.state(), ExecutionState::Idle);

    let again = with_timeout(t.controller.execute_and_wait(spec("specs/other.spec"))).await?;
    assert!(again.status);
    Ok(())
}

#[tokio::test]
async fn panicking_backend_still_produces_a_result() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    runner.script("specs/example.spec", Script::Panic);
    let t = controller_with(Arc::new(runner.clone()));

    let result = with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    assert!(!result.status);
    assert!(result.raw_output.contains("runner backend failed"));
    assert_eq!(t.controller.state(), ExecutionState::Idle);

    let report = t.controller.show_report().expect("report published after failure");
    assert!(!report.result.status);
    Ok(())
}

#[tokio::test]
async fn run_ids_increase_and_repeat_reuses_last_target() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    let t = controller_with(Arc::new(runner.clone()));

    assert!(matches!(
        t.controller.repeat_last_run(),
        Err(ControllerError::UnresolvedContext(_))
    ));

    let first = t.controller.execute(spec("specs/example.spec"))?;
    let first_id = first.run_id();
    with_timeout(first.wait()).await;

    let repeat = t.controller.repeat_last_run()?;
    assert!(repeat.run_id() > first_id);
    assert_eq!(
        repeat.target(),
        &ResolvedTarget::SpecificationFile {
            path: PathBuf::from("specs/example.spec")
        }
    );
    assert!(with_timeout(repeat.wait()).await.status);

    assert_eq!(runner.started().len(), 2);
    assert_eq!(runner.started()[0], runner.started()[1]);
    Ok(())
}

#[tokio::test]
async fn concurrent_submissions_admit_exactly_one() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().holding();
    let t = controller_with(Arc::new(runner.clone()));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let controller = Arc::clone(&t.controller);
        tasks.push(tokio::spawn(async move {
            controller.execute(Target::SpecificationFile(PathBuf::from(format!(
                "specs/{i}.spec"
            ))))
        }));
    }

    let mut admitted = Vec::new();
    let mut rejected = 0;
    for task in tasks {
        match task.await? {
            Ok(handle) => admitted.push(handle),
            Err(ControllerError::AdmissionRejected) => rejected += 1,
            Err(e) => return Err(e.into()),
        }
    }
    assert_eq!(admitted.len(), 1);
    assert_eq!(rejected, 7);

    runner.complete_one();
    for handle in admitted {
        assert!(with_timeout(handle.wait()).await.status);
    }
    Ok(())
}
