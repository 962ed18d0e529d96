use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use specrun::REPORT_URI;
use specrun::fs::FileSystem;
use specrun::fs::mock::MockFileSystem;
use specrun::report::{FileReportSink, ReportPublisher};
use specrun::target::Target;
use specrun_test_utils::builders::{ConfigFileBuilder, controller_with, controller_with_publisher};
use specrun_test_utils::fake_runner::{FakeRunner, Script};
use specrun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn spec(path: &str) -> Target {
    Target::SpecificationFile(PathBuf::from(path))
}

#[tokio::test]
async fn no_report_before_first_run() {
    init_tracing();
    let t = controller_with(Arc::new(FakeRunner::new()));
    assert!(t.controller.show_report().is_none());
}

#[tokio::test]
async fn report_matches_the_run_that_just_finished() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new();
    runner.script("specs/broken.spec", Script::Fail(1));
    let t = controller_with(Arc::new(runner));

    let handle = t.controller.execute(spec("specs/example.spec"))?;
    let first_id = handle.run_id();
    let first = with_timeout(handle.wait()).await;

    let report = t.controller.show_report().expect("report after run");
    assert_eq!(report.uri, REPORT_URI);
    assert_eq!(report.run_id, first_id);
    assert_eq!(report.result, first);
    assert_eq!(report.status_label(), "PASSED");
    let summary = report.summary.as_ref().expect("summary parsed from output");
    assert_eq!(summary.scenarios.map(|c| c.passed), Some(2));

    let handle = t.controller.execute(spec("specs/broken.spec"))?;
    let second_id = handle.run_id();
    with_timeout(handle.wait()).await;

    let report = t.controller.show_report().expect("report replaced");
    assert_eq!(report.uri, REPORT_URI);
    assert_eq!(report.run_id, second_id);
    assert_eq!(report.status_label(), "FAILED");
    assert!(report.render().contains("specs/broken.spec"));
    Ok(())
}

#[tokio::test]
async fn aborted_run_still_publishes_a_report() -> TestResult {
    init_tracing();
    let runner = FakeRunner::new().holding();
    let t = controller_with(Arc::new(runner.clone()));

    let handle = t.controller.execute(Target::AllSpecsInDirectory(None))?;
    runner.wait_for_started(1).await;
    t.controller.stop_execution();
    with_timeout(handle.wait()).await;

    let report = t.controller.show_report().expect("report after abort");
    assert_eq!(report.status_label(), "ABORTED");
    assert!(report.render().contains("Status: ABORTED"));
    Ok(())
}

#[tokio::test]
async fn report_is_persisted_through_the_file_sink() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let publisher = ReportPublisher::new()
        .with_sink(FileReportSink::new(Arc::new(fs.clone()), "reports/last-run.txt"));
    let cfg = ConfigFileBuilder::new().build();
    let t = controller_with_publisher(Arc::new(FakeRunner::new()), publisher, &cfg);

    let result = with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    assert!(result.status);

    let written = fs.read_to_string(Path::new("reports/last-run.txt"))?;
    assert!(written.contains(REPORT_URI));
    assert!(written.contains("Status: PASSED"));
    Ok(())
}

#[tokio::test]
async fn failing_report_sink_does_not_change_the_result() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.set_fail_writes(true);
    let publisher = ReportPublisher::new()
        .with_sink(FileReportSink::new(Arc::new(fs.clone()), "reports/last-run.txt"));
    let cfg = ConfigFileBuilder::new().build();
    let t = controller_with_publisher(Arc::new(FakeRunner::new()), publisher, &cfg);

    let result = with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    assert!(result.status);
    // The in-memory report is still there for display.
    assert!(t.controller.show_report().is_some());

    let again = with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    assert!(again.status);
    Ok(())
}

#[tokio::test]
async fn html_report_is_linked_only_when_it_exists() -> TestResult {
    init_tracing();
    let cfg = ConfigFileBuilder::new()
        .root("/work")
        .html_report("reports/html-report/index.html")
        .build();
    let t = controller_with_publisher(Arc::new(FakeRunner::new()), ReportPublisher::new(), &cfg);

    with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    let report = t.controller.show_report().expect("report");
    assert_eq!(report.html_report, None);

    t.fs
        .add_file("/work/reports/html-report/index.html", "<html></html>");
    with_timeout(t.controller.execute_and_wait(spec("specs/example.spec"))).await?;
    let report = t.controller.show_report().expect("report");
    assert_eq!(
        report.html_report,
        Some(PathBuf::from("/work/reports/html-report/index.html"))
    );
    Ok(())
}
