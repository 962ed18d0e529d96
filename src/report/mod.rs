// src/report/mod.rs

//! Report Publisher.
//!
//! After every admitted run, successful or not, a [`Report`] is published
//! under the fixed identifier [`REPORT_URI`], replacing the previous one
//! wholesale. Display surfaces only read it.

pub mod publisher;
pub mod summary;

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;

use crate::gate::RunId;
use crate::result::{Disposition, ExecutionResult};
use crate::target::ResolvedTarget;

pub use publisher::{FileReportSink, ReportPublisher, ReportSink};
pub use summary::{Counts, RunSummary};

/// Well-known identifier of the last-run report. Constant across runs.
pub const REPORT_URI: &str = "specrun://authority/report.html";

/// Published summary of the most recently completed run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub uri: &'static str,
    pub run_id: RunId,
    pub target: ResolvedTarget,
    pub result: ExecutionResult,
    pub summary: Option<RunSummary>,
    #[serde(with = "humantime_serde")]
    pub finished_at: SystemTime,
    /// Runner-generated HTML report, when one exists on disk.
    pub html_report: Option<PathBuf>,
}

impl Report {
    pub fn new(run_id: RunId, target: ResolvedTarget, result: ExecutionResult) -> Self {
        let summary = RunSummary::parse(&result.raw_output);
        Self {
            uri: REPORT_URI,
            run_id,
            target,
            result,
            summary,
            finished_at: SystemTime::now(),
            html_report: None,
        }
    }

    pub fn with_html_report(mut self, path: Option<PathBuf>) -> Self {
        self.html_report = path;
        self
    }

    pub fn status_label(&self) -> &'static str {
        match self.result.exit.disposition {
            Disposition::Aborted => "ABORTED",
            Disposition::SpawnFailed => "NOT STARTED",
            Disposition::Completed if self.result.status => "PASSED",
            Disposition::Completed => "FAILED",
        }
    }

    /// Plain-text rendering shown by "show report".
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Last run report ({})", self.uri);
        let _ = writeln!(out, "Run #{}: {}", self.run_id, self.target);
        let _ = writeln!(out, "Status: {}", self.status_label());
        if let Some(code) = self.result.exit.exit_code {
            let _ = writeln!(out, "Exit code: {code}");
        }
        if let Some(signal) = self.result.exit.signal {
            let _ = writeln!(out, "Terminated by signal: {signal}");
        }
        if self.result.exit.forced_kill {
            let _ = writeln!(out, "Runner was force-killed after ignoring the stop request");
        }
        let _ = writeln!(
            out,
            "Finished: {}",
            humantime::format_rfc3339_seconds(self.finished_at)
        );
        let _ = writeln!(
            out,
            "Duration: {}",
            humantime::format_duration(round_to_millis(self.result.exit.elapsed))
        );

        if let Some(ref summary) = self.summary {
            if let Some(c) = summary.specifications {
                let _ = writeln!(out, "Specifications: {}", format_counts(&c));
            }
            if let Some(c) = summary.scenarios {
                let _ = writeln!(out, "Scenarios: {}", format_counts(&c));
            }
        }
        if let Some(ref html) = self.html_report {
            let _ = writeln!(out, "HTML report: {}", html.display());
        }

        let _ = writeln!(out, "---- output ----");
        out.push_str(&self.result.raw_output);
        if !self.result.raw_output.is_empty() && !self.result.raw_output.ends_with('\n') {
            out.push('\n');
        }
        out
    }
}

fn format_counts(c: &Counts) -> String {
    format!(
        "{} executed, {} passed, {} failed, {} skipped",
        c.executed, c.passed, c.failed, c.skipped
    )
}

fn round_to_millis(d: std::time::Duration) -> std::time::Duration {
    std::time::Duration::from_millis(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ExitInfo;
    use std::time::Duration;

    fn result(status: bool, disposition: Disposition, raw: &str) -> ExecutionResult {
        ExecutionResult {
            status,
            raw_output: raw.to_string(),
            exit: ExitInfo {
                disposition,
                exit_code: if disposition == Disposition::Completed {
                    Some(if status { 0 } else { 1 })
                } else {
                    None
                },
                signal: None,
                forced_kill: false,
                output_truncated: false,
                elapsed: Duration::from_millis(1234),
            },
        }
    }

    #[test]
    fn render_includes_status_summary_and_output() {
        let report = Report::new(
            7,
            ResolvedTarget::SpecificationFile {
                path: PathBuf::from("specs/example.spec"),
            },
            result(
                true,
                Disposition::Completed,
                "Specifications:\t1 executed\t1 passed\t0 failed\t0 skipped\n",
            ),
        );

        let text = report.render();
        assert!(text.starts_with("Last run report (specrun://authority/report.html)\n"));
        assert!(text.contains("Run #7: specs/example.spec"));
        assert!(text.contains("Status: PASSED"));
        assert!(text.contains("Specifications: 1 executed, 1 passed, 0 failed, 0 skipped"));
        assert!(text.contains("Duration: 1s 234ms"));
    }

    #[test]
    fn aborted_run_is_labelled_aborted() {
        let report = Report::new(
            1,
            ResolvedTarget::PreviouslyFailed,
            result(false, Disposition::Aborted, "Execution aborted.\n"),
        );
        assert_eq!(report.status_label(), "ABORTED");
    }
}
