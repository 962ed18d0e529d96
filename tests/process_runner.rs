#![cfg(unix)]

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use specrun::config::ConfigFile;
use specrun::controller::ExecutionController;
use specrun::gate::ExecutionState;
use specrun::result::Disposition;
use specrun::target::{EditorState, Target};
use specrun_test_utils::builders::ConfigFileBuilder;
use specrun_test_utils::init_tracing;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn Error>>;

fn fixture(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(rel)
}

fn config(mode: &str) -> ConfigFile {
    let script = fixture("fake-runner.sh");
    ConfigFileBuilder::new()
        .program("sh")
        .args(&[script.to_str().expect("utf-8 fixture path")])
        .root(fixture("sample_project"))
        .env("FAKE_RUNNER_MODE", mode)
        .abort_grace(Duration::from_millis(300))
        .build()
}

fn build_controller(cfg: &ConfigFile) -> Result<ExecutionController, Box<dyn Error>> {
    Ok(ExecutionController::from_config(
        cfg,
        Arc::new(EditorState::new()),
    )?)
}

async fn within<F: std::future::Future>(f: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(15), f)
        .await
        .expect("runner did not finish in time")
}

#[tokio::test]
async fn passing_runner_output_is_collected() -> TestResult {
    init_tracing();
    let controller = build_controller(&config("pass"))?;

    let result = within(controller.execute_and_wait(Target::parse("specs/example.spec:6")?)).await?;
    assert!(result.status, "output: {}", result.raw_output);
    assert_eq!(result.exit.exit_code, Some(0));
    assert!(result.raw_output.contains("# running specs/example.spec:6"));

    let report = controller.show_report().expect("report");
    let scenarios = report.summary.as_ref().and_then(|s| s.scenarios);
    assert_eq!(scenarios.map(|c| c.executed), Some(2));
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_is_a_failed_run() -> TestResult {
    init_tracing();
    let controller = build_controller(&config("fail"))?;

    let result = within(controller.execute_and_wait(Target::AllSpecsInDirectory(None))).await?;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::Completed);
    assert_eq!(result.exit.exit_code, Some(1));
    assert!(result.raw_output.contains("Failed Step: Vowel count is 3"));
    Ok(())
}

#[tokio::test]
async fn failed_flag_replaces_the_descriptor() -> TestResult {
    init_tracing();
    let controller = build_controller(&config("pass"))?;

    let result = within(controller.execute_and_wait(Target::PreviouslyFailed)).await?;
    assert!(result.status);
    assert!(result.raw_output.contains("# running --failed"));
    Ok(())
}

#[tokio::test]
async fn missing_runner_binary_fails_without_output() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .program("specrun-no-such-runner")
        .root(fixture("sample_project"))
        .build();
    let controller = build_controller(&cfg)?;

    let result = within(controller.execute_and_wait(Target::parse("specs/example.spec")?)).await?;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::SpawnFailed);
    assert!(result.raw_output.contains("specrun-no-such-runner"));
    Ok(())
}

#[tokio::test]
async fn stop_terminates_the_runner() -> TestResult {
    init_tracing();
    let controller = build_controller(&config("hang"))?;

    let handle = controller.execute(Target::AllSpecsInDirectory(None))?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(controller.stop_execution());

    let result = within(handle.wait()).await;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::Aborted);
    assert!(!result.exit.forced_kill);

    let again = build_controller(&config("pass"))?;
    assert!(within(again.execute_and_wait(Target::AllSpecsInDirectory(None))).await?.status);
    Ok(())
}

#[tokio::test]
async fn runner_ignoring_terminate_is_killed_after_grace() -> TestResult {
    init_tracing();
    let controller = build_controller(&config("stubborn"))?;

    let handle = controller.execute(Target::AllSpecsInDirectory(None))?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(controller.stop_execution());

    let result = within(handle.wait()).await;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::Aborted);
    assert!(result.exit.forced_kill);
    Ok(())
}

#[tokio::test]
async fn output_beyond_the_limit_is_truncated() -> TestResult {
    init_tracing();
    let script = fixture("fake-runner.sh");
    let cfg = ConfigFileBuilder::new()
        .program("sh")
        .args(&[script.to_str().expect("utf-8 fixture path")])
        .root(fixture("sample_project"))
        .max_output_bytes(16)
        .build();
    let controller = build_controller(&cfg)?;

    let result = within(controller.execute_and_wait(Target::AllSpecsInDirectory(None))).await?;
    assert!(result.status);
    assert!(result.exit.output_truncated);
    assert!(result.raw_output.contains("[output truncated]"));
    Ok(())
}

#[tokio::test]
async fn non_utf8_output_does_not_break_a_passing_run() -> TestResult {
    init_tracing();
    let controller = build_controller(&config("latin1"))?;

    let result = within(controller.execute_and_wait(Target::AllSpecsInDirectory(None))).await?;
    assert!(result.status, "exit: {:?}", result.exit);
    assert_eq!(result.exit.exit_code, Some(0));
    assert!(result.raw_output.contains("caf\u{FFFD} au lait"));
    assert!(result.raw_output.contains("step 1999"));
    assert!(!result.exit.output_truncated);
    Ok(())
}

#[tokio::test]
async fn oversized_line_is_clipped_without_failing_the_run() -> TestResult {
    init_tracing();
    let script = fixture("fake-runner.sh");
    let cfg = ConfigFileBuilder::new()
        .program("sh")
        .args(&[script.to_str().expect("utf-8 fixture path")])
        .root(fixture("sample_project"))
        .env("FAKE_RUNNER_MODE", "longline")
        .max_output_bytes(4096)
        .build();
    let controller = build_controller(&cfg)?;

    let result = within(controller.execute_and_wait(Target::AllSpecsInDirectory(None))).await?;
    assert!(result.status, "exit: {:?}", result.exit);
    assert!(result.exit.output_truncated);
    assert!(result.raw_output.len() < 8192);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn stop_before_spawn_never_starts_the_runner() -> TestResult {
    init_tracing();
    let scratch = TempDir::new()?;
    let marker = scratch.path().join("started");
    let script = fixture("fake-runner.sh");
    let cfg = ConfigFileBuilder::new()
        .program("sh")
        .args(&[script.to_str().expect("utf-8 fixture path")])
        .root(fixture("sample_project"))
        .env("FAKE_RUNNER_MARKER", marker.to_str().expect("utf-8 temp path"))
        .build();
    let controller = build_controller(&cfg)?;

    // Single-threaded runtime: the run task cannot be polled before the stop.
    let handle = controller.execute(Target::AllSpecsInDirectory(None))?;
    assert!(controller.stop_execution());

    let result = within(handle.wait()).await;
    assert!(!result.status);
    assert_eq!(result.exit.disposition, Disposition::Aborted);
    assert!(!result.exit.forced_kill);
    assert!(!marker.exists(), "runner process was started");
    assert_eq!(controller.state(), ExecutionState::Idle);
    Ok(())
}
